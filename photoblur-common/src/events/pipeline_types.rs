//! Pipeline-related type definitions
//!
//! Supporting types for job roles, job outcomes and coordinator phases.

use serde::{Deserialize, Serialize};

/// Role of a blur job, and the layer its result is painted on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobRole {
    /// Lightly-blurred backdrop filling the window
    Background,
    /// User-controlled preview painted over the backdrop
    Foreground,
}

impl std::fmt::Display for JobRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobRole::Background => write!(f, "background"),
            JobRole::Foreground => write!(f, "foreground"),
        }
    }
}

/// Terminal status of a blur job run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Filter produced an image and it was handed to the completion sink
    Completed,
    /// Cancellation observed at a checkpoint; nothing delivered
    Cancelled,
    /// Filter produced no result (unreadable or corrupt input)
    FilterUnavailable,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::FilterUnavailable => write!(f, "filter-unavailable"),
        }
    }
}

/// Coordinator phase for the currently loaded image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    /// No image loaded
    #[default]
    Idle,
    /// Background and first foreground jobs submitted, no foreground painted yet
    Priming,
    /// Foreground painted; settled control values drive new foreground jobs
    Ready,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Idle => write!(f, "Idle"),
            PipelinePhase::Priming => write!(f, "Priming"),
            PipelinePhase::Ready => write!(f, "Ready"),
        }
    }
}
