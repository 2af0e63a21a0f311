//! Pipeline event helpers

use photoblur_common::events::PipelineEvent;
use std::time::Duration;
use tokio::sync::broadcast;

/// Upper bound for any single wait in the integration tests
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Next event matching `pred`, skipping others; panics on timeout
pub async fn next_event<F>(rx: &mut broadcast::Receiver<PipelineEvent>, mut pred: F) -> PipelineEvent
where
    F: FnMut(&PipelineEvent) -> bool,
{
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = rx.recv().await.expect("event bus closed or lagged");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for pipeline event")
}

/// All events up to and including the first one matching `pred`
pub async fn collect_until<F>(
    rx: &mut broadcast::Receiver<PipelineEvent>,
    mut pred: F,
) -> Vec<PipelineEvent>
where
    F: FnMut(&PipelineEvent) -> bool,
{
    let mut seen = Vec::new();
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = rx.recv().await.expect("event bus closed or lagged");
            let done = pred(&event);
            seen.push(event);
            if done {
                return;
            }
        }
    })
    .await
    .expect("timed out waiting for pipeline event");
    seen
}
