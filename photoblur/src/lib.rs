//! # Photoblur Pipeline Library
//!
//! Coordination core for an interactive blur preview: a lightly-blurred
//! background fill plus a foreground preview that follows a continuous
//! intensity control.
//!
//! **Architecture:** control events → `InputDebouncer` → `PipelineCoordinator`
//! → `JobScheduler` (one worker per job role) → `BlurJob::run` → result posted
//! back to the UI context → `UiSink`.

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod filter;
pub mod job;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod ui;

pub use config::PipelineConfig;
pub use coordinator::PipelineCoordinator;
pub use debounce::{DebouncedSignal, InputDebouncer, SignalKind};
pub use filter::{BlurFilter, GaussianBlurFilter};
pub use job::{BlurJob, CompletionSink, JobId, JobNotice, JobOutcome};
pub use photoblur_common::{Error, Intensity, Result};
pub use scheduler::{JobScheduler, SchedulerStats};
pub use session::{PipelineSession, SessionHandle};
pub use ui::{ControlEvent, UiDispatcher, UiMessage, UiSink};
