//! HTTP collector notifier driver.

use super::{EventEnvelope, Notifier, NotifyError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Default request timeout for collector POSTs in seconds.
const COLLECTOR_REQUEST_TIMEOUT_SECS: u64 = 10;

/// POSTs JSON envelopes to a telemetry collector endpoint.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    /// Create a notifier for the given collector URL.
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(COLLECTOR_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(HttpNotifier {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, envelope: &EventEnvelope) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(envelope)
            .send()
            .await?
            .error_for_status()?;

        debug!(
            target: "meter.notify",
            event_id = %envelope.payload.id,
            status = %response.status(),
            "Collector accepted event"
        );
        Ok(())
    }
}
