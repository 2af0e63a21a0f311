//! # Photoblur Common Library
//!
//! Shared code for the photoblur workspace:
//! - Error types
//! - Intensity value type
//! - Configuration loading (TOML bootstrap file)
//! - Event types (PipelineEvent enum) and EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod intensity;

pub use error::{Error, Result};
pub use intensity::Intensity;
