//! Test helper modules for photoblur integration tests
//!
//! - GatedFilter: blur filter whose calls block until the test releases them
//! - RecordingSink: UiSink that records every notification
//! - event helpers: wait for pipeline events with a timeout

#![allow(dead_code)]

pub mod events;
pub mod gated_filter;
pub mod recording_sink;

pub use events::{collect_until, next_event, EVENT_TIMEOUT};
pub use gated_filter::GatedFilter;
pub use recording_sink::{RecordingSink, UiCall};

use photoblur::PipelineConfig;
use std::time::Duration;

/// Pipeline configuration with a short quiet period for real-time tests
pub fn test_config(debounce_ms: u64) -> PipelineConfig {
    PipelineConfig {
        debounce: Duration::from_millis(debounce_ms),
        ..PipelineConfig::default()
    }
}
