//! Event types for the photoblur event system
//!
//! Provides pipeline event definitions and the EventBus used by observers
//! (tests, the CLI's JSON event stream) to follow what the coordinator does.

mod pipeline_types;

pub use pipeline_types::{JobRole, JobStatus, PipelinePhase};

use crate::Intensity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline event types
///
/// Events are broadcast via EventBus and can be serialized for logging or
/// external monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A new source image was opened
    ImageOpened {
        /// Path of the opened image
        path: PathBuf,
        /// When the image was opened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Coordinator phase changed
    PhaseChanged {
        /// Phase before change
        old_phase: PipelinePhase,
        /// Phase after change
        new_phase: PipelinePhase,
        /// When phase changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A blur job was handed to the scheduler
    JobSubmitted {
        /// Job identifier
        job_id: Uuid,
        /// Job role
        role: JobRole,
        /// Requested intensity
        intensity: Intensity,
        /// When the job was submitted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A blur job was superseded or the pipeline was reset
    JobCancelled {
        /// Job identifier
        job_id: Uuid,
        /// Job role
        role: JobRole,
        /// When the job was cancelled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A blur job run reached a terminal status on its worker
    JobFinished {
        /// Job identifier
        job_id: Uuid,
        /// Job role
        role: JobRole,
        /// Terminal status
        status: JobStatus,
        /// When the run finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A layer was repainted with a job result
    LayerUpdated {
        /// Job whose result was painted
        job_id: Uuid,
        /// Layer painted
        role: JobRole,
        /// Intensity of the painted image
        intensity: Intensity,
        /// When the layer was updated
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Compare control pressed or released
    CompareChanged {
        /// True while the unblurred original is shown
        showing_original: bool,
        /// When the view switched
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Bookkeeping mismatch detected; the pipeline was reset and re-primed
    InvariantViolation {
        /// Description of the mismatch
        message: String,
        /// When it was detected
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use photoblur_common::events::{EventBus, PipelineEvent, PipelinePhase};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PipelineEvent::PhaseChanged {
///     old_phase: PipelinePhase::Idle,
///     new_phase: PipelinePhase::Priming,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
