//! Configuration loading
//!
//! Bootstrap configuration comes from a single TOML file. The file is
//! located using this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `<user config dir>/photoblur/config.toml`
//! 4. Built-in defaults (no file)
//!
//! A missing file is never fatal unless it was named explicitly on the
//! command line.

use crate::{Error, Intensity, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "PHOTOBLUR_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Quiet period before a control value is considered settled (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Fixed intensity of the background fill layer
    #[serde(default = "default_background_intensity")]
    pub background_intensity: Intensity,

    /// Intensity of the first foreground paint after an image is opened
    #[serde(default)]
    pub initial_intensity: Intensity,

    /// Gaussian sigma applied per intensity step by the default filter
    #[serde(default = "default_sigma_per_step")]
    pub sigma_per_step: f32,

    /// Pipeline event bus capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_background_intensity() -> Intensity {
    Intensity::saturating(40)
}

fn default_sigma_per_step() -> f32 {
    0.25
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            background_intensity: default_background_intensity(),
            initial_intensity: Intensity::ZERO,
            sigma_per_step: default_sigma_per_step(),
            event_capacity: default_event_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn parse(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Locate and load the configuration file, falling back to defaults
    ///
    /// An explicit `cli_arg` that does not exist is an error; every other
    /// missing source degrades to the next one.
    pub fn resolve(cli_arg: Option<&Path>, env_var_name: &str) -> Result<Self> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            info!("Loading configuration from {}", path.display());
            return Self::load(path);
        }

        // Priority 2: Environment variable
        if let Ok(value) = std::env::var(env_var_name) {
            let path = PathBuf::from(value);
            if path.exists() {
                info!("Loading configuration from {} ({})", path.display(), env_var_name);
                return Self::load(&path);
            }
            warn!(
                "{} points to missing file {}, ignoring",
                env_var_name,
                path.display()
            );
        }

        // Priority 3: User config directory
        if let Some(path) = default_config_path() {
            if path.exists() {
                info!("Loading configuration from {}", path.display());
                return Self::load(&path);
            }
        }

        // Priority 4: Built-in defaults
        info!("No configuration file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Check value ranges the deserializer cannot express
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config("debounce_ms must be greater than 0".to_string()));
        }
        if !self.sigma_per_step.is_finite() || self.sigma_per_step <= 0.0 {
            return Err(Error::Config(format!(
                "sigma_per_step must be a positive number, got {}",
                self.sigma_per_step
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Platform configuration file location (`~/.config/photoblur/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("photoblur").join("config.toml"))
}
