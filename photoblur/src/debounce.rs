//! Input debouncer
//!
//! Coalesces a burst of raw control values. Every accepted value yields a
//! live signal immediately; a settled signal carrying the latest value
//! follows once the input has been quiet for the configured interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Kind of debounced emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Intermediate value, emitted for every input
    Live,
    /// Value after a quiet period
    Settled,
}

/// Debounced stream element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncedSignal {
    /// Raw control value
    pub value: i64,
    /// Sequence number, strictly increasing across live and settled signals
    pub seq: u64,
    /// Debouncer generation the value was pushed in
    pub generation: u64,
    pub kind: SignalKind,
}

impl DebouncedSignal {
    pub fn is_settled(&self) -> bool {
        self.kind == SignalKind::Settled
    }
}

/// Restartable debouncer for a single input stream
///
/// Owned by the UI context; `push` and `flush` are non-blocking. Settled
/// signals are delivered on the receiver returned by `new`.
pub struct InputDebouncer {
    quiet: Duration,
    seq: Arc<AtomicU64>,
    /// Bumped on every push/flush; a timer only fires for its own generation
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<DebouncedSignal>,
}

impl InputDebouncer {
    /// Create a debouncer with the given quiet interval
    pub fn new(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<DebouncedSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            quiet,
            seq: Arc::new(AtomicU64::new(0)),
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            tx,
        };
        (debouncer, rx)
    }

    /// Accept a raw value
    ///
    /// Returns the live signal for it and restarts the settle timer. Zero is
    /// an ordinary value here. Must be called inside a tokio runtime.
    pub fn push(&mut self, value: i64) -> DebouncedSignal {
        let generation = self.restart();
        let live = DebouncedSignal {
            value,
            seq: self.seq.fetch_add(1, Ordering::SeqCst) + 1,
            generation,
            kind: SignalKind::Live,
        };

        let quiet = self.quiet;
        let seq = Arc::clone(&self.seq);
        let current = Arc::clone(&self.generation);
        let tx = self.tx.clone();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let settled = DebouncedSignal {
                value,
                seq: seq.fetch_add(1, Ordering::SeqCst) + 1,
                generation,
                kind: SignalKind::Settled,
            };
            trace!("Input settled at {} (seq {})", value, settled.seq);
            let _ = tx.send(settled);
        }));

        live
    }

    /// Drop any pending settle without emitting it
    ///
    /// A settle that already reached the receiver stays queued there; check
    /// it with `is_current` before acting on it.
    pub fn flush(&mut self) {
        self.restart();
    }

    /// False for a signal produced before the latest push or flush
    pub fn is_current(&self, signal: &DebouncedSignal) -> bool {
        signal.generation == self.generation.load(Ordering::SeqCst)
    }

    /// True while a settle timer is armed and has not fired
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn restart(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for InputDebouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    const QUIET: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_last_value() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);

        for value in [10, 20, 30] {
            let live = debouncer.push(value);
            assert_eq!(live.kind, SignalKind::Live);
            assert_eq!(live.value, value);
            sleep(Duration::from_millis(100)).await;
        }
        let last_input = Instant::now() - Duration::from_millis(100);

        let settled = rx.recv().await.unwrap();
        assert!(settled.is_settled());
        assert_eq!(settled.value, 30);
        let waited = Instant::now() - last_input;
        assert!(waited >= QUIET && waited < QUIET + Duration::from_millis(50));

        sleep(QUIET * 3).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_input_restarts_timer() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);

        debouncer.push(5);
        sleep(Duration::from_millis(900)).await;
        debouncer.push(60);
        sleep(Duration::from_millis(900)).await;

        // 1.8s after the first input, nothing has settled yet
        assert!(rx.try_recv().is_err());
        assert!(debouncer.has_pending());

        let settled = rx.recv().await.unwrap();
        assert_eq!(settled.value, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_is_an_ordinary_value() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);
        debouncer.push(40);
        debouncer.push(0);

        let settled = rx.recv().await.unwrap();
        assert_eq!(settled.value, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restartable_after_settle() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);

        debouncer.push(10);
        let first = rx.recv().await.unwrap();
        debouncer.push(20);
        let second = rx.recv().await.unwrap();

        assert_eq!((first.value, second.value), (10, 20));
        assert!(second.seq > first.seq);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_numbers_increase() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);

        let a = debouncer.push(1);
        let b = debouncer.push(2);
        let settled = rx.recv().await.unwrap();

        assert!(a.seq < b.seq);
        assert!(b.seq < settled.seq);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_discards_pending_settle() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);

        debouncer.push(70);
        debouncer.flush();
        assert!(!debouncer.has_pending());

        sleep(QUIET * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_queued_before_flush_is_not_current() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);

        debouncer.push(70);
        sleep(QUIET + Duration::from_millis(10)).await;
        // The settle has already been sent when the flush happens
        debouncer.flush();

        let settled = rx.recv().await.unwrap();
        assert_eq!(settled.value, 70);
        assert!(!debouncer.is_current(&settled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_is_current_until_next_input() {
        let (mut debouncer, mut rx) = InputDebouncer::new(QUIET);

        let live = debouncer.push(30);
        assert!(debouncer.is_current(&live));
        let settled = rx.recv().await.unwrap();
        assert!(debouncer.is_current(&settled));

        debouncer.push(31);
        assert!(!debouncer.is_current(&settled));
    }
}
