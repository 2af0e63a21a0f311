//! Job scheduler
//!
//! Single point of truth for which blur jobs are in flight.
//!
//! **Architecture:**
//! - One role slot per `JobRole`; a new submission cancels the slot's
//!   previous occupant before taking its place
//! - One worker task per role, each with its own queue, so cancelling one
//!   role's job never touches the other role's execution
//! - Filter calls run through `spawn_blocking`; everything else here is
//!   non-blocking
//! - Readiness gate: a foreground job does not start until the current
//!   background job has delivered, or was discarded

use crate::filter::BlurFilter;
use crate::job::{BlurJob, JobId};
use photoblur_common::events::{EventBus, JobRole, JobStatus, PipelineEvent};
use photoblur_common::{Error, Intensity, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Background readiness as seen by foreground jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// Background job still running; foreground jobs wait
    Pending,
    /// Background delivered, or no background to wait for
    Open,
    /// Background cancelled or produced nothing; foreground runs independently
    Discarded,
}

/// How a queued job relates to the readiness gate
enum ReadinessGate {
    /// Background job: settles the gate when it finishes
    Opens(Arc<watch::Sender<GateState>>),
    /// Foreground job: waits for the gate before running
    Waits(watch::Receiver<GateState>),
}

/// Job handed to a role worker
struct QueuedJob {
    job: BlurJob,
    gate: ReadinessGate,
}

/// Slot occupant
#[derive(Debug, Clone)]
struct InFlight {
    id: JobId,
    intensity: Intensity,
    token: CancellationToken,
}

/// Role slots, guarded by one mutex so `submit` and `cancel_all` are atomic
/// with respect to each other
struct RoleSlots {
    background: Option<InFlight>,
    foreground: Option<InFlight>,
    gate: Arc<watch::Sender<GateState>>,
}

impl RoleSlots {
    fn new() -> Self {
        Self {
            background: None,
            foreground: None,
            gate: Arc::new(open_gate()),
        }
    }

    fn slot_mut(&mut self, role: JobRole) -> &mut Option<InFlight> {
        match role {
            JobRole::Background => &mut self.background,
            JobRole::Foreground => &mut self.foreground,
        }
    }

    fn slot(&self, role: JobRole) -> Option<&InFlight> {
        match role {
            JobRole::Background => self.background.as_ref(),
            JobRole::Foreground => self.foreground.as_ref(),
        }
    }
}

fn open_gate() -> watch::Sender<GateState> {
    watch::channel(GateState::Open).0
}

/// Move a still-pending gate to its final state
fn settle_gate(gate: &watch::Sender<GateState>, state: GateState) {
    gate.send_if_modified(|current| {
        if *current == GateState::Pending {
            *current = state;
            true
        } else {
            false
        }
    });
}

/// Scheduler counters
#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    superseded: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    unavailable: AtomicU64,
}

/// Snapshot of scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Jobs accepted by `submit`
    pub submitted: u64,
    /// Jobs cancelled because a newer job took their slot or the pipeline reset
    pub superseded: u64,
    /// Runs that delivered a result
    pub completed: u64,
    /// Runs that observed cancellation
    pub cancelled: u64,
    /// Runs where the filter produced nothing
    pub unavailable: u64,
}

/// State shared between the scheduler front end and its role workers
struct Shared {
    slots: Mutex<RoleSlots>,
    counters: Counters,
    event_bus: EventBus,
}

impl Shared {
    fn lock_slots(&self) -> MutexGuard<'_, RoleSlots> {
        // Slot updates are single assignments; a panicked holder cannot leave them torn
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_cancelled(&self, role: JobRole, occupant: &InFlight) {
        self.counters.superseded.fetch_add(1, Ordering::Relaxed);
        self.event_bus.emit_lossy(PipelineEvent::JobCancelled {
            job_id: occupant.id,
            role,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Two-role blur job scheduler
///
/// Must be created inside a tokio runtime (it spawns its role workers).
pub struct JobScheduler {
    shared: Arc<Shared>,
    background_tx: mpsc::UnboundedSender<QueuedJob>,
    foreground_tx: mpsc::UnboundedSender<QueuedJob>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stop: CancellationToken,
}

impl JobScheduler {
    /// Create the scheduler and start one worker per role
    pub fn new(filter: Arc<dyn BlurFilter>, event_bus: EventBus) -> Self {
        let shared = Arc::new(Shared {
            slots: Mutex::new(RoleSlots::new()),
            counters: Counters::default(),
            event_bus,
        });
        let stop = CancellationToken::new();

        let (background_tx, background_rx) = mpsc::unbounded_channel();
        let (foreground_tx, foreground_rx) = mpsc::unbounded_channel();

        let workers = vec![
            tokio::spawn(worker_loop(
                JobRole::Background,
                background_rx,
                Arc::clone(&filter),
                Arc::clone(&shared),
                stop.clone(),
            )),
            tokio::spawn(worker_loop(
                JobRole::Foreground,
                foreground_rx,
                filter,
                Arc::clone(&shared),
                stop.clone(),
            )),
        ];

        info!("Job scheduler started with background and foreground workers");

        Self {
            shared,
            background_tx,
            foreground_tx,
            workers: Mutex::new(workers),
            stop,
        }
    }

    /// Submit a job
    ///
    /// Cancels the job currently occupying the same role slot (without
    /// waiting for its worker to notice), registers the new job in the slot
    /// and queues it on the role's worker.
    pub fn submit(&self, job: BlurJob) -> Result<JobId> {
        if self.stop.is_cancelled() {
            return Err(Error::Shutdown("Job scheduler is shutting down".to_string()));
        }

        let role = job.role();
        let occupant = InFlight {
            id: job.id(),
            intensity: job.intensity(),
            token: job.cancel_handle(),
        };

        let mut slots = self.shared.lock_slots();

        if let Some(previous) = slots.slot_mut(role).take() {
            previous.token.cancel();
            debug!(
                "Superseded {} job {} ({}) with {} ({})",
                role, previous.id, previous.intensity, occupant.id, occupant.intensity
            );
            self.shared.emit_cancelled(role, &previous);
        }

        let gate = match role {
            JobRole::Background => {
                let (gate_tx, _) = watch::channel(GateState::Pending);
                let gate_tx = Arc::new(gate_tx);
                let previous = std::mem::replace(&mut slots.gate, Arc::clone(&gate_tx));
                settle_gate(&previous, GateState::Discarded);
                ReadinessGate::Opens(gate_tx)
            }
            JobRole::Foreground => ReadinessGate::Waits(slots.gate.subscribe()),
        };

        let id = occupant.id;
        let intensity = occupant.intensity;
        *slots.slot_mut(role) = Some(occupant);

        let queue = match role {
            JobRole::Background => &self.background_tx,
            JobRole::Foreground => &self.foreground_tx,
        };
        if queue.send(QueuedJob { job, gate }).is_err() {
            slots.slot_mut(role).take();
            return Err(Error::Shutdown(format!("{} worker has stopped", role)));
        }
        drop(slots);

        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.event_bus.emit_lossy(PipelineEvent::JobSubmitted {
            job_id: id,
            role,
            intensity,
            timestamp: chrono::Utc::now(),
        });
        debug!("Submitted {} job {} at {}", role, id, intensity);

        Ok(id)
    }

    /// Cancel every in-flight job and clear both role slots
    ///
    /// Returns the number of jobs cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut slots = self.shared.lock_slots();
        let mut count = 0;

        for role in [JobRole::Background, JobRole::Foreground] {
            if let Some(occupant) = slots.slot_mut(role).take() {
                occupant.token.cancel();
                self.shared.emit_cancelled(role, &occupant);
                count += 1;
            }
        }

        let previous = std::mem::replace(&mut slots.gate, Arc::new(open_gate()));
        settle_gate(&previous, GateState::Discarded);

        if count > 0 {
            debug!("Cancelled {} in-flight job(s)", count);
        }
        count
    }

    /// Job currently occupying a role slot
    pub fn in_flight(&self, role: JobRole) -> Option<JobId> {
        self.shared.lock_slots().slot(role).map(|occupant| occupant.id)
    }

    /// Counter snapshot
    pub fn stats(&self) -> SchedulerStats {
        let c = &self.shared.counters;
        SchedulerStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            superseded: c.superseded.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            unavailable: c.unavailable.load(Ordering::Relaxed),
        }
    }

    /// Cancel everything and stop both role workers
    ///
    /// A filter call already running on a blocking thread finishes on its
    /// own; its result is suppressed by the cancelled token.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        self.cancel_all();

        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            guard.drain(..).collect()
        };
        for handle in workers {
            handle.abort();
            let _ = handle.await;
        }
        info!("Job scheduler stopped");
    }
}

/// Role worker: runs queued jobs one at a time
async fn worker_loop(
    role: JobRole,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    filter: Arc<dyn BlurFilter>,
    shared: Arc<Shared>,
    stop: CancellationToken,
) {
    debug!("{} worker started", role);

    loop {
        let queued = tokio::select! {
            _ = stop.cancelled() => break,
            queued = rx.recv() => match queued {
                Some(queued) => queued,
                None => break,
            },
        };

        let QueuedJob { job, gate } = queued;
        let id = job.id();
        let token = job.cancel_handle();

        let opens = match gate {
            ReadinessGate::Opens(gate_tx) => Some(gate_tx),
            ReadinessGate::Waits(mut gate_rx) => {
                tokio::select! {
                    // Cancelled while held; run() observes it at its entry checkpoint
                    _ = token.cancelled() => {}
                    waited = gate_rx.wait_for(|state| *state != GateState::Pending) => {
                        match waited.map(|state| *state) {
                            Ok(state) => debug!("Job {} released by background gate ({:?})", id, state),
                            // Gate sender dropped: nothing left to wait for
                            Err(_) => debug!("Job {} gate closed, running independently", id),
                        }
                    }
                }
                None
            }
        };

        let run_filter = Arc::clone(&filter);
        let status = match tokio::task::spawn_blocking(move || job.run(run_filter.as_ref())).await {
            Ok(status) => status,
            Err(e) => {
                error!("{} job {} panicked in filter: {}", role, id, e);
                JobStatus::FilterUnavailable
            }
        };

        if let Some(gate_tx) = opens {
            let state = if status == JobStatus::Completed {
                GateState::Open
            } else {
                GateState::Discarded
            };
            settle_gate(&gate_tx, state);
        }

        {
            let mut slots = shared.lock_slots();
            let slot = slots.slot_mut(role);
            if slot.as_ref().map(|occupant| occupant.id) == Some(id) {
                *slot = None;
            }
        }

        let counter = match status {
            JobStatus::Completed => &shared.counters.completed,
            JobStatus::Cancelled => &shared.counters.cancelled,
            JobStatus::FilterUnavailable => &shared.counters.unavailable,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        shared.event_bus.emit_lossy(PipelineEvent::JobFinished {
            job_id: id,
            role,
            status,
            timestamp: chrono::Utc::now(),
        });
        debug!("{} job {} finished: {}", role, id, status);
    }

    debug!("{} worker stopped", role);
}
