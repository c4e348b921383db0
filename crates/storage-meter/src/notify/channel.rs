//! In-process channel notifier driver.

use super::{EventEnvelope, Notifier, NotifyError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Forwards envelopes into a `tokio::sync::mpsc` channel.
///
/// Used by tests and by embedders that bridge events onto their own bus
/// from a consumer task.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<EventEnvelope>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving half of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (ChannelNotifier { sender }, receiver)
    }

    /// Wrap an existing sender.
    pub fn from_sender(sender: mpsc::Sender<EventEnvelope>) -> Self {
        ChannelNotifier { sender }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, envelope: &EventEnvelope) -> Result<(), NotifyError> {
        self.sender
            .send(envelope.clone())
            .await
            .map_err(|_| NotifyError::ChannelClosed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::super::tests::sample_envelope;
    use super::*;

    #[tokio::test]
    async fn test_envelope_arrives_on_channel() {
        let (notifier, mut receiver) = ChannelNotifier::new(4);
        let envelope = sample_envelope();

        notifier.notify(&envelope).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received, envelope);
    }

    #[tokio::test]
    async fn test_closed_channel_is_an_error() {
        let (notifier, receiver) = ChannelNotifier::new(4);
        drop(receiver);

        let result = notifier.notify(&sample_envelope()).await;
        assert!(matches!(result, Err(NotifyError::ChannelClosed)));
    }
}
