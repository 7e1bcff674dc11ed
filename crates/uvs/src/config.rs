//! Composes the workspace's settings from defaults, an optional TOML file
//! and prefixed environment variables, the way the teacher's
//! `ConfigLoader` builds a `figment::Figment` and extracts/validates in one
//! pass.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uvs_coordinator::UnifiedStoreConfig;
use uvs_domain::constants::CONFIG_ENV_PREFIX;
use uvs_domain::error::{Error, Result};

/// Settings for the in-process primary provider's connection pool, kept
/// separate from [`UnifiedStoreConfig`] since it describes a provider, not
/// the coordinator that sits in front of providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum concurrent primary-provider operations.
    pub size: usize,
    /// How long a caller waits for a pool permit before `Unavailable`.
    pub acquire_timeout_ms: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: 10,
            acquire_timeout_ms: uvs_domain::constants::DEFAULT_POOL_ACQUIRE_TIMEOUT_MS,
        }
    }
}

/// How loudly and in what shape to log. Mirrors the subset of the
/// teacher's `LoggingConfig` that still applies once the HTTP/admin
/// surfaces it also covers are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// A `tracing`/`EnvFilter`-compatible directive, e.g. `"info"` or
    /// `"uvs_coordinator=debug,warn"`.
    pub level: String,
    /// Emit structured JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Maintenance task cadence, seconds-granularity so it round-trips cleanly
/// through TOML/env without a custom `Duration` serde shim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    /// Importance decay interval, in seconds.
    pub decay_interval_secs: u64,
    /// Access-bookkeeping flush interval, in seconds.
    pub access_flush_interval_secs: u64,
    /// Embedding cache eviction sweep interval, in seconds.
    pub cache_eviction_interval_secs: u64,
    /// Provider health poll interval, in seconds.
    pub health_poll_interval_secs: u64,
    /// Mirror reconciliation interval, in seconds.
    pub mirror_resync_interval_secs: u64,
    /// Page size for the hash-backfill and mirror-resync tasks.
    pub batch_size: usize,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            decay_interval_secs: 3600,
            access_flush_interval_secs: 30,
            cache_eviction_interval_secs: 300,
            health_poll_interval_secs: 15,
            mirror_resync_interval_secs: 120,
            batch_size: 500,
        }
    }
}

/// The whole-program settings value: the coordinator's own config plus the
/// facade-level concerns (provider pool sizing, secondary provider names,
/// logging, maintenance cadence) that sit above it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreSettings {
    /// Coordinator configuration (dedup mode, deadlines, failover policy, ...).
    pub coordinator: UnifiedStoreConfig,
    /// Primary provider connection pool sizing.
    pub pool: PoolSettings,
    /// Names of secondary providers to stand up alongside the primary.
    pub secondary_provider_names: Vec<String>,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Background maintenance task cadence.
    pub maintenance: MaintenanceSettings,
}

/// Loads [`StoreSettings`] from layered sources, later sources overriding
/// earlier ones: built-in defaults → TOML file → `UVS_`-prefixed
/// environment variables.
#[derive(Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// A loader with no file path set yet, using [`CONFIG_ENV_PREFIX`] for
    /// environment variables.
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Merge in a TOML file at `path` if it exists; a missing path is not
    /// an error, it simply contributes nothing.
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the environment variable prefix (default `"UVS"`, so e.g.
    /// `UVS_COORDINATOR_DEDUP_MODE`).
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Compose and validate settings from every configured source.
    pub fn load(&self) -> Result<StoreSettings> {
        let mut figment = Figment::new().merge(Serialized::defaults(StoreSettings::default()));

        if let Some(path) = &self.config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(&format!("{}_", self.env_prefix)).split("_"));

        let settings: StoreSettings = figment
            .extract()
            .map_err(|e| Error::invalid_input("config", e.to_string()))?;

        settings.coordinator.validate()?;
        Ok(settings)
    }
}
