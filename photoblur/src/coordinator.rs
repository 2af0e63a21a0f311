//! Pipeline coordinator
//!
//! Policy layer between debounced input and the job scheduler. Runs on the
//! UI context only: every method here is non-blocking and is called from
//! the session loop, including result application.
//!
//! Phases per loaded image:
//! - **Idle**: no image
//! - **Priming**: background job (fixed intensity) and first foreground job
//!   submitted; leaves on the first foreground paint
//! - **Ready**: settled control values drive new foreground jobs
//!
//! While the compare control is held the foreground layer shows the sharp
//! original; foreground results landing meanwhile are kept and painted on
//! release.

use crate::config::PipelineConfig;
use crate::debounce::{DebouncedSignal, SignalKind};
use crate::job::{BlurJob, CompletionSink, ImageRef, JobId, JobNotice, JobOutcome};
use crate::scheduler::JobScheduler;
use crate::ui::{UiDispatcher, UiSink};
use image::RgbaImage;
use photoblur_common::events::{EventBus, JobRole, PipelineEvent, PipelinePhase};
use photoblur_common::{Error, Intensity};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Job the coordinator considers current for a role
#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub id: JobId,
    pub intensity: Intensity,
    token: CancellationToken,
}

impl TrackedJob {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Per-image pipeline state
#[derive(Debug, Default)]
pub struct PipelineState {
    pub phase: PipelinePhase,
    /// Current source image
    pub image: Option<ImageRef>,
    /// Last intensity a foreground job was requested for
    pub last_requested: Option<Intensity>,
    /// In-flight foreground job
    pub foreground: Option<TrackedJob>,
    /// In-flight background job
    pub background: Option<TrackedJob>,
    /// Most recent foreground image painted
    pub last_foreground: Option<Arc<RgbaImage>>,
    /// Unblurred original, kept from zero-intensity foreground results
    pub original: Option<Arc<RgbaImage>>,
    /// Compare control held
    pub comparing: bool,
}

/// Pipeline coordinator
pub struct PipelineCoordinator {
    config: PipelineConfig,
    scheduler: Arc<JobScheduler>,
    dispatcher: UiDispatcher,
    event_bus: EventBus,
    sink: Box<dyn UiSink>,
    state: PipelineState,
}

impl PipelineCoordinator {
    pub fn new(
        config: PipelineConfig,
        scheduler: Arc<JobScheduler>,
        dispatcher: UiDispatcher,
        event_bus: EventBus,
        sink: Box<dyn UiSink>,
    ) -> Self {
        Self {
            config,
            scheduler,
            dispatcher,
            event_bus,
            sink,
            state: PipelineState::default(),
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.state.phase
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn last_requested(&self) -> Option<Intensity> {
        self.state.last_requested
    }

    /// Foreground image currently painted (what a save would write)
    pub fn current_foreground(&self) -> Option<Arc<RgbaImage>> {
        self.state.last_foreground.clone()
    }

    /// Load a new source image
    ///
    /// Cancels everything belonging to the previous image, resets UI
    /// decoration and primes the new image.
    pub fn open_image(&mut self, path: PathBuf) {
        if self.state.phase != PipelinePhase::Idle {
            debug!("Replacing current image, cancelling in-flight jobs");
            self.reset_pipeline();
        }

        info!("Opening image {}", path.display());
        self.state.image = Some(Arc::new(path.clone()));
        self.event_bus.emit_lossy(PipelineEvent::ImageOpened {
            path,
            timestamp: chrono::Utc::now(),
        });

        self.prime();
    }

    /// Drop the current image and return to Idle
    pub fn clear_image(&mut self) {
        if self.state.phase == PipelinePhase::Idle {
            return;
        }
        info!("Clearing image");
        self.reset_pipeline();
        self.set_phase(PipelinePhase::Idle);
    }

    /// Handle a debounced control signal
    pub fn on_signal(&mut self, signal: DebouncedSignal) {
        if self.state.phase == PipelinePhase::Idle {
            debug!("Ignoring control value {} with no image loaded", signal.value);
            return;
        }

        let intensity = Intensity::saturating(signal.value);

        match signal.kind {
            SignalKind::Live => {
                // Cheap feedback only; no blur per control step
                self.sink.set_busy(true);
                self.sink.set_label(&intensity.to_string());
            }
            SignalKind::Settled => self.on_settled(intensity),
        }
    }

    fn on_settled(&mut self, intensity: Intensity) {
        if self.state.last_requested == Some(intensity) {
            debug!("Settled intensity {} already requested, skipping", intensity);
            if self.state.foreground.is_none() {
                self.sink.set_busy(false);
                self.sink.set_label("");
            }
            return;
        }

        self.state.last_requested = Some(intensity);
        self.sink.set_busy(true);
        self.submit(JobRole::Foreground, intensity);
    }

    /// Apply a finished job's result on the UI context
    pub fn on_job_outcome(&mut self, outcome: JobOutcome) {
        if outcome.is_stale() {
            debug!("Dropping result of cancelled {} job {}", outcome.role, outcome.job_id);
            return;
        }
        if !self.untrack(outcome.role, outcome.job_id) {
            return;
        }

        let primed = match outcome.role {
            JobRole::Background => {
                self.sink.set_layer(JobRole::Background, Arc::clone(&outcome.image));
                false
            }
            JobRole::Foreground => {
                if outcome.intensity.is_zero() {
                    self.state.original = Some(Arc::clone(&outcome.image));
                }
                self.state.last_foreground = Some(Arc::clone(&outcome.image));
                if self.state.comparing {
                    debug!("Compare held, deferring foreground paint");
                } else {
                    self.sink.set_layer(JobRole::Foreground, Arc::clone(&outcome.image));
                }
                self.sink.set_busy(false);
                self.sink.set_label("");
                self.sink.set_controls_enabled(true);
                self.state.phase == PipelinePhase::Priming
            }
        };

        debug!(
            "Painted {} layer from job {} at {}",
            outcome.role, outcome.job_id, outcome.intensity
        );
        self.event_bus.emit_lossy(PipelineEvent::LayerUpdated {
            job_id: outcome.job_id,
            role: outcome.role,
            intensity: outcome.intensity,
            timestamp: chrono::Utc::now(),
        });

        // First foreground paint ends priming
        if primed {
            self.set_phase(PipelinePhase::Ready);
        }
    }

    /// Handle a job that finished without an image
    ///
    /// Layers stay as they are. The job is no longer tracked, a foreground
    /// notice takes down the busy indicator and ends priming.
    pub fn on_job_unavailable(&mut self, notice: JobNotice) {
        if notice.is_stale() {
            debug!("Dropping notice of cancelled {} job {}", notice.role, notice.job_id);
            return;
        }
        if !self.untrack(notice.role, notice.job_id) {
            return;
        }

        warn!(
            "No {} image at {} for the current source (job {})",
            notice.role, notice.intensity, notice.job_id
        );
        if notice.role == JobRole::Foreground {
            self.sink.set_busy(false);
            self.sink.set_label("");
            if self.state.phase == PipelinePhase::Priming {
                self.set_phase(PipelinePhase::Ready);
            }
        }
    }

    /// Show the unblurred original while the compare control is held
    ///
    /// `showing_original == false` restores the current preview.
    pub fn set_compare(&mut self, showing_original: bool) {
        if self.state.phase == PipelinePhase::Idle || self.state.comparing == showing_original {
            return;
        }

        if showing_original {
            let Some(original) = self.state.original.clone() else {
                debug!("No unblurred original painted yet, ignoring compare");
                return;
            };
            self.sink.set_layer(JobRole::Foreground, original);
        } else if let Some(current) = self.state.last_foreground.clone() {
            self.sink.set_layer(JobRole::Foreground, current);
        }

        self.state.comparing = showing_original;
        self.event_bus.emit_lossy(PipelineEvent::CompareChanged {
            showing_original,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Stop tracking a finished job; false (after handling the violation)
    /// if it is not the job tracked for its role
    fn untrack(&mut self, role: JobRole, job_id: JobId) -> bool {
        let slot = match role {
            JobRole::Background => &mut self.state.background,
            JobRole::Foreground => &mut self.state.foreground,
        };
        let tracked = slot.as_ref().map(|job| job.id);
        if tracked == Some(job_id) {
            *slot = None;
            return true;
        }

        let message = format!(
            "uncancelled {} job {} finished but {:?} is current",
            role, job_id, tracked
        );
        self.invariant_violation(message);
        false
    }

    /// Submit the background job and the first foreground job
    fn prime(&mut self) {
        self.sink.set_controls_enabled(false);
        self.sink.set_label("");
        self.sink.set_busy(true);

        let initial = self.config.initial_intensity;
        self.state.last_requested = Some(initial);
        self.set_phase(PipelinePhase::Priming);

        self.submit(JobRole::Background, self.config.background_intensity);
        self.submit(JobRole::Foreground, initial);
    }

    fn submit(&mut self, role: JobRole, intensity: Intensity) {
        let Some(image) = self.state.image.clone() else {
            warn!("No image loaded, not submitting {} job", role);
            return;
        };

        let job = BlurJob::new(
            image,
            intensity,
            role,
            CompletionSink::new(self.dispatcher.clone()),
        );
        let tracked = TrackedJob {
            id: job.id(),
            intensity,
            token: job.cancel_handle(),
        };

        match self.scheduler.submit(job) {
            Ok(_) => {
                let slot = match role {
                    JobRole::Background => &mut self.state.background,
                    JobRole::Foreground => &mut self.state.foreground,
                };
                *slot = Some(tracked);
            }
            Err(e) => warn!("Failed to submit {} job: {}", role, e),
        }
    }

    /// Cancel all jobs and discard UI decoration; keeps the phase
    fn reset_pipeline(&mut self) {
        self.scheduler.cancel_all();

        self.state.foreground = None;
        self.state.background = None;
        self.state.last_requested = None;
        self.state.last_foreground = None;
        self.state.original = None;
        self.state.comparing = false;
        self.state.image = None;

        self.sink.clear_layers();
        self.sink.set_busy(false);
        self.sink.set_label("");
        self.sink.set_controls_enabled(false);
    }

    fn invariant_violation(&mut self, message: String) {
        let err = Error::InvariantViolation(message);
        error!("{}", err);
        self.event_bus.emit_lossy(PipelineEvent::InvariantViolation {
            message: err.to_string(),
            timestamp: chrono::Utc::now(),
        });

        if self.config.strict_invariants {
            panic!("{}", err);
        }

        // Recover: start the current image over
        let image = self.state.image.clone();
        self.reset_pipeline();
        match image {
            Some(image) => {
                self.state.image = Some(image);
                self.prime();
            }
            None => self.set_phase(PipelinePhase::Idle),
        }
    }

    fn set_phase(&mut self, new_phase: PipelinePhase) {
        let old_phase = self.state.phase;
        if old_phase == new_phase {
            return;
        }
        self.state.phase = new_phase;
        info!("Pipeline phase {} -> {}", old_phase, new_phase);
        self.event_bus.emit_lossy(PipelineEvent::PhaseChanged {
            old_phase,
            new_phase,
            timestamp: chrono::Utc::now(),
        });
    }
}
