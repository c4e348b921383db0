//! Background event dispatcher.
//!
//! Finished requests hand their envelopes to a [`DispatchHandle`]; a
//! dispatcher task owned by the [`crate::Meter`] drains the queue and drives
//! the notifier. Each publish attempt runs under the configured send
//! timeout; timed-out or failed sends are retried until they succeed or
//! shutdown is requested.
//!
//! # Queue policy
//!
//! - Unbounded (inline mode): no event is ever dropped; enqueueing never
//!   blocks request handling.
//! - Bounded (nonblocking mode): enqueueing uses `try_send` and discards the
//!   event with a warning when the queue is full, so a slow or unavailable
//!   collector cannot pile memory onto the proxy.
//!
//! # Graceful Shutdown
//!
//! The task supports graceful shutdown via a cancellation token. When the
//! token is cancelled, in-flight and queued events are abandoned and the
//! task exits cleanly.

use crate::notify::{EventEnvelope, Notifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Queue capacity policy for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueuePolicy {
    /// Never drop events; queue grows as needed.
    Unbounded,
    /// Drop new events when `capacity` envelopes are queued.
    Bounded {
        /// Maximum queued envelopes.
        capacity: usize,
    },
}

enum QueueSender {
    Unbounded(mpsc::UnboundedSender<EventEnvelope>),
    Bounded(mpsc::Sender<EventEnvelope>),
}

/// Sending half of the dispatcher queue.
///
/// `record` is synchronous so it can be called from body completion (which
/// may happen in `Drop`, outside any `await` point).
pub(crate) struct DispatchHandle {
    sender: QueueSender,
}

impl DispatchHandle {
    /// Enqueue an envelope for publishing.
    pub(crate) fn record(&self, envelope: EventEnvelope) {
        match &self.sender {
            QueueSender::Unbounded(sender) => {
                if sender.send(envelope).is_err() {
                    warn!(
                        target: "meter.dispatch",
                        "Dispatcher stopped, event discarded"
                    );
                }
            }
            QueueSender::Bounded(sender) => match sender.try_send(envelope) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(envelope)) => {
                    warn!(
                        target: "meter.dispatch",
                        event_id = %envelope.payload.id,
                        "Send queue full, event discarded"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(
                        target: "meter.dispatch",
                        "Dispatcher stopped, event discarded"
                    );
                }
            },
        }
    }
}

/// Spawn the dispatcher task and return the sending handle.
pub(crate) fn spawn(
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
    policy: QueuePolicy,
    cancel_token: CancellationToken,
) -> DispatchHandle {
    info!(
        target: "meter.dispatch",
        send_timeout_secs = send_timeout.as_secs(),
        policy = ?policy,
        "Starting event dispatcher task"
    );

    match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_unbounded(rx, notifier, send_timeout, cancel_token));
            DispatchHandle {
                sender: QueueSender::Unbounded(tx),
            }
        }
        QueuePolicy::Bounded { capacity } => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            tokio::spawn(run_bounded(rx, notifier, send_timeout, cancel_token));
            DispatchHandle {
                sender: QueueSender::Bounded(tx),
            }
        }
    }
}

async fn run_unbounded(
    mut rx: mpsc::UnboundedReceiver<EventEnvelope>,
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(envelope) => deliver(&*notifier, envelope, send_timeout, &cancel_token).await,
                None => break,
            },
            _ = cancel_token.cancelled() => break,
        }
    }
    info!(target: "meter.dispatch", "Event dispatcher task stopped");
}

async fn run_bounded(
    mut rx: mpsc::Receiver<EventEnvelope>,
    notifier: Arc<dyn Notifier>,
    send_timeout: Duration,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(envelope) => deliver(&*notifier, envelope, send_timeout, &cancel_token).await,
                None => break,
            },
            _ = cancel_token.cancelled() => break,
        }
    }
    info!(target: "meter.dispatch", "Event dispatcher task stopped");
}

/// Publish one envelope, retrying timed-out or failed attempts until
/// delivery succeeds or shutdown is requested.
async fn deliver(
    notifier: &dyn Notifier,
    envelope: EventEnvelope,
    send_timeout: Duration,
    cancel_token: &CancellationToken,
) {
    loop {
        tokio::select! {
            attempt = tokio::time::timeout(send_timeout, notifier.notify(&envelope)) => {
                match attempt {
                    Ok(Ok(())) => {
                        debug!(
                            target: "meter.dispatch",
                            event_id = %envelope.payload.id,
                            "Event published"
                        );
                        return;
                    }
                    Ok(Err(e)) => {
                        warn!(
                            target: "meter.dispatch",
                            event_id = %envelope.payload.id,
                            error = %e,
                            "Publish failed, retrying"
                        );
                    }
                    Err(_) => {
                        warn!(
                            target: "meter.dispatch",
                            event_id = %envelope.payload.id,
                            timeout_secs = send_timeout.as_secs(),
                            "Timeout publishing event, retrying"
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                warn!(
                    target: "meter.dispatch",
                    event_id = %envelope.payload.id,
                    "Shutdown requested, abandoning event"
                );
                return;
            }
        }
    }
}
