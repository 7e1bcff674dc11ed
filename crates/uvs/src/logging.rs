//! Structured logging bootstrap, the facade's analogue of the teacher's
//! `mcb_infrastructure::logging::init_logging` minus file rotation (no
//! `tracing-appender` dependency in this workspace — stdout only, which is
//! all an embedded library needs; the embedding application owns its own
//! log sinks).

use crate::config::LoggingSettings;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uvs_domain::error::{Error, Result};

/// Install a global `tracing` subscriber built from `settings`. Idempotent
/// only in the sense that `tracing`'s own global-subscriber guard is —
/// calling this twice in one process returns an error from the second
/// call, which callers should treat as non-fatal (logging is already up).
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_env("UVS_LOG").unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

    let result = if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_file(true).with_line_number(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    result.map_err(|e| Error::internal(format!("failed to initialize logging: {e}")))
}
