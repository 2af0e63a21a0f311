//! Common error types for photoblur

use thiserror::Error;

/// Common result type for photoblur operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared across the photoblur crates
///
/// Job cancellation and an unavailable filter result are not errors; they are
/// reported as job statuses and never leave the coordinator.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error (wraps toml::de::Error)
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Image decode/encode error (wraps image::ImageError)
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scheduler/coordinator bookkeeping no longer matches reality
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Component is shutting down and no longer accepts work
    #[error("Shutting down: {0}")]
    Shutdown(String),
}
