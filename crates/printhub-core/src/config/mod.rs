//! Application configuration schemas.
//!
//! All configuration structs are deserialized from an optional TOML file via
//! the `config` crate, overlaid by `PRINTHUB__*` environment variables. Every
//! section carries defaults so the binaries run without any file at all.

pub mod channel;
pub mod consumer;
pub mod launcher;
pub mod logging;
pub mod spool;

use serde::{Deserialize, Serialize};

pub use self::channel::ChannelConfig;
pub use self::consumer::{ConsumerAction, ConsumerConfig};
pub use self::launcher::LauncherConfig;
pub use self::logging::LoggingConfig;
pub use self::spool::SpoolConfig;

use crate::error::AppError;

/// Default location of the system-wide configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/printhub/printhub.toml";

/// Environment variable naming an alternate configuration file.
pub const CONFIG_ENV_VAR: &str = "PRINTHUB_CONFIG";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Spool store settings.
    #[serde(default)]
    pub spool: SpoolConfig,
    /// Notification channel settings.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Job consumer settings.
    #[serde(default)]
    pub consumer: ConsumerConfig,
    /// Consumer launcher settings (producer side).
    #[serde(default)]
    pub launcher: LauncherConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. Environment variables prefixed with
    /// `PRINTHUB__` override file values, e.g. `PRINTHUB__CHANNEL__TCP_PORT`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from(std::path::Path::new(path)).required(false))
            .add_source(
                config::Environment::with_prefix("PRINTHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Resolve the configuration path from `PRINTHUB_CONFIG`, falling back to
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
