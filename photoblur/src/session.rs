//! Pipeline session
//!
//! The UI context. One task owns the coordinator, the debouncer and the
//! output sink, and processes control events, settled signals and job
//! results strictly one at a time. Nothing else mutates UI state.

use crate::config::PipelineConfig;
use crate::coordinator::PipelineCoordinator;
use crate::debounce::{DebouncedSignal, InputDebouncer};
use crate::filter::BlurFilter;
use crate::scheduler::{JobScheduler, SchedulerStats};
use crate::store::ImageStore;
use crate::ui::{ControlEvent, UiDispatcher, UiMessage, UiSink};
use photoblur_common::events::{EventBus, PipelineEvent};
use photoblur_common::Result;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a running session
pub struct SessionHandle {
    dispatcher: UiDispatcher,
    event_bus: EventBus,
    scheduler: Arc<JobScheduler>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Post a control event onto the UI context
    pub fn send(&self, event: ControlEvent) -> Result<()> {
        self.dispatcher.post(UiMessage::Control(event))
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_bus.subscribe()
    }

    /// Scheduler counter snapshot
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Stop the UI context and the scheduler
    pub async fn shutdown(self) {
        if self.dispatcher.post(UiMessage::Shutdown).is_err() {
            debug!("UI context already stopped");
        }
        if let Err(e) = self.task.await {
            warn!("Session task ended abnormally: {}", e);
        }
        self.scheduler.shutdown().await;
    }
}

/// UI context state
pub struct PipelineSession {
    coordinator: PipelineCoordinator,
    debouncer: InputDebouncer,
    settled_rx: mpsc::UnboundedReceiver<DebouncedSignal>,
    ui_rx: mpsc::UnboundedReceiver<UiMessage>,
    store: Box<dyn ImageStore>,
}

impl PipelineSession {
    /// Build the pipeline and start its UI context task
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        config: PipelineConfig,
        filter: Arc<dyn BlurFilter>,
        sink: Box<dyn UiSink>,
        store: Box<dyn ImageStore>,
    ) -> SessionHandle {
        let event_bus = EventBus::new(config.event_capacity);
        let scheduler = Arc::new(JobScheduler::new(filter, event_bus.clone()));
        let (dispatcher, ui_rx) = UiDispatcher::channel();
        let (debouncer, settled_rx) = InputDebouncer::new(config.debounce);

        info!(
            "Starting pipeline session (debounce {:?}, background {})",
            config.debounce, config.background_intensity
        );

        let coordinator = PipelineCoordinator::new(
            config,
            Arc::clone(&scheduler),
            dispatcher.clone(),
            event_bus.clone(),
            sink,
        );

        let session = Self {
            coordinator,
            debouncer,
            settled_rx,
            ui_rx,
            store,
        };
        let task = tokio::spawn(session.run());

        SessionHandle {
            dispatcher,
            event_bus,
            scheduler,
            task,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                message = self.ui_rx.recv() => match message {
                    Some(UiMessage::Shutdown) | None => break,
                    Some(UiMessage::Control(event)) => self.handle_control(event),
                    Some(UiMessage::JobOutcome(outcome)) => self.coordinator.on_job_outcome(outcome),
                    Some(UiMessage::JobUnavailable(notice)) => self.coordinator.on_job_unavailable(notice),
                },
                Some(signal) = self.settled_rx.recv() => self.on_settled(signal),
            }
        }

        self.debouncer.flush();
        info!("Pipeline session stopped");
    }

    fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::IntensityChanged(value) => self.push_intensity(value),
            ControlEvent::ResetRequested => {
                debug!("Reset requested");
                self.push_intensity(0);
            }
            ControlEvent::ImageOpened(path) => {
                // A settle computed for the old image must not land on the new one
                self.debouncer.flush();
                self.coordinator.open_image(path);
            }
            ControlEvent::ImageCleared => {
                self.debouncer.flush();
                self.coordinator.clear_image();
            }
            ControlEvent::CompareStarted => self.coordinator.set_compare(true),
            ControlEvent::CompareEnded => self.coordinator.set_compare(false),
            ControlEvent::SaveRequested(path) => match self.coordinator.current_foreground() {
                Some(image) => {
                    if let Err(e) = self.store.save(&path, &image) {
                        warn!("Failed to save preview to {}: {}", path.display(), e);
                    }
                }
                None => warn!("Nothing to save yet, ignoring save to {}", path.display()),
            },
        }
    }

    fn on_settled(&mut self, signal: DebouncedSignal) {
        // Queued before a flush or a newer input
        if !self.debouncer.is_current(&signal) {
            debug!("Dropping superseded settle {} (seq {})", signal.value, signal.seq);
            return;
        }
        self.coordinator.on_signal(signal);
    }

    fn push_intensity(&mut self, value: i64) {
        let live = self.debouncer.push(value);
        self.coordinator.on_signal(live);
    }
}
