//! Text normalization shared by the embedding pipeline and dedup hash tier.
//!
//! Normalization must be idempotent (`norm(norm(x)) == norm(x)`) and the
//! same function must back both the hash stored at write time and the
//! hash recomputed during the dedup probe.

use unicode_normalization::UnicodeNormalization;

/// Unicode-NFC normalize, collapse runs of whitespace to a single space,
/// and trim leading/trailing whitespace.
pub fn normalize(text: &str) -> String {
    let nfc: String = text.nfc().collect();
    let mut out = String::with_capacity(nfc.len());
    let mut last_was_space = false;
    for ch in nfc.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let x = "  hello   world \u{0301}  ";
        assert_eq!(normalize(&normalize(x)), normalize(x));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("a\n\n  b\t c"), "a b c");
    }

    #[test]
    fn trims() {
        assert_eq!(normalize("  hi  "), "hi");
    }
}
