//! Blur jobs
//!
//! A `BlurJob` describes one filter invocation and carries its own
//! cancellation state. `run` is the only place the filter is called, and the
//! job itself enforces that a cancelled job never delivers a result.

use crate::filter::BlurFilter;
use crate::ui::{UiDispatcher, UiMessage};
use image::RgbaImage;
use photoblur_common::events::{JobRole, JobStatus};
use photoblur_common::Intensity;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Unique job identifier
pub type JobId = Uuid;

/// Shared read-only handle to the source image
pub type ImageRef = Arc<PathBuf>;

/// Result of a completed job, posted to the UI context
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Job that produced the image
    pub job_id: JobId,
    /// Layer the image belongs to
    pub role: JobRole,
    /// Intensity the image was blurred with
    pub intensity: Intensity,
    /// Filter output
    pub image: Arc<RgbaImage>,
    /// Cancellation state of the producing job
    pub token: CancellationToken,
}

impl JobOutcome {
    /// True if the producing job was cancelled after the result was posted
    ///
    /// The UI context checks this before applying, so a result posted just
    /// before its job was superseded is still discarded.
    pub fn is_stale(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Terminal notice for a job that finished without an image
///
/// Posted instead of a `JobOutcome` so the UI context can stop tracking the
/// job. Never changes a layer.
#[derive(Debug, Clone)]
pub struct JobNotice {
    pub job_id: JobId,
    pub role: JobRole,
    pub intensity: Intensity,
    pub token: CancellationToken,
}

impl JobNotice {
    /// True if the job was cancelled after the notice was posted
    pub fn is_stale(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Single-shot completion sink
///
/// Consumed by `deliver` or `report_unavailable`, so it fires at most once.
#[derive(Debug)]
pub struct CompletionSink {
    dispatcher: UiDispatcher,
}

impl CompletionSink {
    /// Sink that posts onto the given UI context
    pub fn new(dispatcher: UiDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Post the outcome; returns false if the UI context is gone
    fn deliver(self, outcome: JobOutcome) -> bool {
        self.dispatcher.post(UiMessage::JobOutcome(outcome)).is_ok()
    }

    /// Post a no-result notice
    fn report_unavailable(self, notice: JobNotice) {
        if self.dispatcher.post(UiMessage::JobUnavailable(notice)).is_err() {
            debug!("UI context closed, unavailable notice dropped");
        }
    }
}

/// One blur computation
///
/// Lifecycle: Pending (created) → Running (`run` entered) →
/// Completed | Cancelled | FilterUnavailable. `run` takes `self`, so a job
/// cannot be run twice.
#[derive(Debug)]
pub struct BlurJob {
    id: JobId,
    source: ImageRef,
    intensity: Intensity,
    role: JobRole,
    cancel: CancellationToken,
    sink: CompletionSink,
}

impl BlurJob {
    /// Create a pending job
    pub fn new(source: ImageRef, intensity: Intensity, role: JobRole, sink: CompletionSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            intensity,
            role,
            cancel: CancellationToken::new(),
            sink,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn role(&self) -> JobRole {
        self.role
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    /// Cancel the job
    ///
    /// Idempotent and callable from any thread. The flag only ever moves
    /// from false to true.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Handle sharing this job's cancellation state
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the filter synchronously
    ///
    /// Checks cancellation at entry and again right after the filter
    /// returns. Only a job that passes both checkpoints and gets an image
    /// from the filter delivers a result; an uncancelled job that gets
    /// nothing (or whose filter panics) posts a `JobNotice` instead.
    pub fn run(self, filter: &dyn BlurFilter) -> JobStatus {
        if self.cancel.is_cancelled() {
            debug!("Job {} ({}) cancelled before start", self.id, self.role);
            return JobStatus::Cancelled;
        }

        debug!(
            "Running {} job {} at {} on {}",
            self.role,
            self.id,
            self.intensity,
            self.source.display()
        );
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            filter.apply_blur(&self.source, self.intensity)
        }))
        .unwrap_or_else(|_| {
            error!("Blur filter panicked on {} (job {})", self.source.display(), self.id);
            None
        });

        if self.cancel.is_cancelled() {
            debug!("Job {} ({}) cancelled during filter, result discarded", self.id, self.role);
            return JobStatus::Cancelled;
        }

        let Some(image) = result else {
            warn!(
                "Blur filter produced no result for {} (job {})",
                self.source.display(),
                self.id
            );
            self.sink.report_unavailable(JobNotice {
                job_id: self.id,
                role: self.role,
                intensity: self.intensity,
                token: self.cancel.clone(),
            });
            return JobStatus::FilterUnavailable;
        };

        let outcome = JobOutcome {
            job_id: self.id,
            role: self.role,
            intensity: self.intensity,
            image: Arc::new(image),
            token: self.cancel.clone(),
        };

        if self.sink.deliver(outcome) {
            JobStatus::Completed
        } else {
            debug!("UI context closed, job {} result dropped", self.id);
            JobStatus::Cancelled
        }
    }
}
