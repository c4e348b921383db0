//! Structured-log notifier driver.

use super::{EventEnvelope, Notifier, NotifyError};
use async_trait::async_trait;

/// Emits envelopes through `tracing` at info level.
///
/// This is the default driver; it makes the middleware useful without any
/// external telemetry infrastructure and doubles as an audit log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a log notifier.
    pub fn new() -> Self {
        LogNotifier
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, envelope: &EventEnvelope) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(&envelope.payload)?;
        tracing::info!(
            target: "meter.notify",
            event_type = %envelope.event_type,
            publisher_id = %envelope.publisher_id,
            topic = %envelope.topic,
            event_id = %envelope.payload.id,
            payload = %payload,
            "Audit event"
        );
        Ok(())
    }
}
