//! Event publishing seam.
//!
//! The middleware hands finished events to a [`Notifier`]. The broker
//! binding is deliberately behind this trait: deployments that publish to a
//! message bus implement it over their bus client, while the drivers shipped
//! here cover structured logs, an HTTP collector, and an in-process channel.

mod channel;
mod http;
mod log;

pub use channel::ChannelNotifier;
pub use http::HttpNotifier;
pub use log::LogNotifier;

use async_trait::async_trait;
use cadf::Event;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event type attached to every request envelope.
pub const EVENT_TYPE_HTTP_REQUEST: &str = "objectstore.http.request";

/// A CADF event wrapped with its routing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type consumers route on (`objectstore.http.request`).
    pub event_type: String,

    /// Identifier of the publishing middleware instance.
    pub publisher_id: String,

    /// Topic the event is published to.
    pub topic: String,

    /// The audit event itself.
    pub payload: Event,
}

/// Errors produced by notifier drivers.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HTTP publish failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel closed, event not delivered")]
    ChannelClosed,
}

/// Publishes event envelopes to a telemetry pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish one envelope.
    ///
    /// Implementations should return only once the envelope has been
    /// accepted by the transport; the dispatcher applies its own timeout
    /// and retries on failure.
    async fn notify(&self, envelope: &EventEnvelope) -> Result<(), NotifyError>;
}
