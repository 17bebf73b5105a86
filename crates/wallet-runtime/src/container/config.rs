//! # Runtime Configuration
//!
//! Logging and wiring settings for the wallet runtime. Every field has a
//! default; environment variables override them.
//!
//! | Variable | Field |
//! |---|---|
//! | `WALLET_LOG_LEVEL` (falls back to `RUST_LOG`) | `logging.filter` |
//! | `WALLET_JSON_LOGS` | `logging.json` |
//! | `WALLET_MANIFEST` | `wiring.manifest_path` |
//! | `WALLET_STRICT_BOOT` | `wiring.strict` |

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Controller wiring configuration.
    pub wiring: WiringConfig,
}

impl RuntimeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(filter) = lookup("WALLET_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            config.logging.filter = filter;
        }
        if let Some(json) = lookup("WALLET_JSON_LOGS") {
            config.logging.json = parse_flag(&json);
        }
        if let Some(path) = lookup("WALLET_MANIFEST") {
            if !path.trim().is_empty() {
                config.wiring.manifest_path = Some(PathBuf::from(path));
            }
        }
        if let Some(strict) = lookup("WALLET_STRICT_BOOT") {
            config.wiring.strict = parse_flag(&strict);
        }

        config
    }

    /// Check the configuration before anything is started.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the log filter is not a valid `EnvFilter` directive
    /// - the manifest path is set but does not point at a file
    pub fn validate(&self) -> Result<(), ConfigError> {
        if EnvFilter::try_new(&self.logging.filter).is_err() {
            return Err(ConfigError::InvalidLogFilter(self.logging.filter.clone()));
        }
        if let Some(path) = &self.wiring.manifest_path {
            if !path.is_file() {
                return Err(ConfigError::ManifestNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The log filter could not be parsed.
    InvalidLogFilter(String),
    /// `WALLET_MANIFEST` points at something that is not a file.
    ManifestNotFound(PathBuf),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidLogFilter(filter) => {
                write!(f, "invalid log filter {filter:?}; see WALLET_LOG_LEVEL")
            }
            ConfigError::ManifestNotFound(path) => {
                write!(f, "manifest {} does not exist; see WALLET_MANIFEST", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `messenger_bus=debug,info`.
    pub filter: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Controller wiring configuration.
#[derive(Debug, Clone, Default)]
pub struct WiringConfig {
    /// Delegation manifest to load. `None` uses the built-in manifest.
    pub manifest_path: Option<PathBuf>,
    /// Treat wiring warnings as boot failures: unresolved grants and
    /// manifest entries without a controller.
    pub strict: bool,
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
