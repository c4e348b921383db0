//! Recording notifier for assertions on published events.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use storage_meter::{EventEnvelope, Notifier, NotifyError};

/// How often [`RecordingNotifier::wait_for`] re-checks the captured list.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captures every envelope it is asked to publish.
///
/// Per-call delays can be injected to simulate a slow collector: the first
/// call sleeps for the first configured delay, the second for the next, and
/// calls beyond the list complete immediately. A delayed call that is
/// abandoned by the dispatcher timeout records nothing, which is exactly
/// the retry behavior tests want to observe.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    envelopes: Mutex<Vec<EventEnvelope>>,
    delays: Mutex<VecDeque<Duration>>,
}

impl RecordingNotifier {
    /// Notifier that records immediately.
    pub fn new() -> Self {
        RecordingNotifier::default()
    }

    /// Notifier whose first calls sleep for the given durations.
    pub fn with_delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        RecordingNotifier {
            envelopes: Mutex::new(Vec::new()),
            delays: Mutex::new(delays.into_iter().collect()),
        }
    }

    /// Envelopes recorded so far.
    pub fn envelopes(&self) -> Vec<EventEnvelope> {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of envelopes recorded so far.
    pub fn len(&self) -> usize {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` envelopes have been recorded.
    ///
    /// Returns the recorded envelopes, or the timeout error when the count
    /// was not reached in time.
    pub async fn wait_for(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<EventEnvelope>, tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, async {
            loop {
                let envelopes = self.envelopes();
                if envelopes.len() >= count {
                    return envelopes;
                }
                tokio::time::sleep(WAIT_POLL_INTERVAL).await;
            }
        })
        .await
    }

    /// Assert-style helper: wait briefly and confirm nothing was recorded.
    pub async fn settled_empty(&self, settle: Duration) -> bool {
        tokio::time::sleep(settle).await;
        self.is_empty()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, envelope: &EventEnvelope) -> Result<(), NotifyError> {
        let delay = self
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
        Ok(())
    }
}
