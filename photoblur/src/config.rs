//! Runtime pipeline configuration
//!
//! Derived from the TOML bootstrap file (`photoblur_common::config::TomlConfig`)
//! into the typed values the coordinator and debouncer use.

use photoblur_common::config::TomlConfig;
use photoblur_common::Intensity;
use std::time::Duration;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Quiet period before a control value is settled
    pub debounce: Duration,

    /// Fixed intensity of the background layer
    pub background_intensity: Intensity,

    /// Intensity of the first foreground paint
    pub initial_intensity: Intensity,

    /// Gaussian sigma per intensity step for the default filter
    pub sigma_per_step: f32,

    /// Event bus capacity
    pub event_capacity: usize,

    /// Panic on bookkeeping mismatches instead of resetting the pipeline
    ///
    /// Defaults to on in debug builds, off in release builds.
    pub strict_invariants: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

impl PipelineConfig {
    /// Build runtime configuration from the validated bootstrap file
    pub fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            debounce: Duration::from_millis(toml.debounce_ms),
            background_intensity: toml.background_intensity,
            initial_intensity: toml.initial_intensity,
            sigma_per_step: toml.sigma_per_step,
            event_capacity: toml.event_capacity,
            strict_invariants: cfg!(debug_assertions),
        }
    }
}
