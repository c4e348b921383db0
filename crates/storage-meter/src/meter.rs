//! Meter instance: policy, dispatcher, and layer construction.

use crate::config::MeterConfig;
use crate::dispatch::{self, DispatchHandle, QueuePolicy};
use crate::errors::MeterError;
use crate::event::{MeterRules, RequestSnapshot};
use crate::identity::ProjectResolver;
use crate::middleware::MeterLayer;
use crate::notify::{LogNotifier, Notifier};
use cadf::Outcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shared state behind every [`crate::middleware::MeterService`] produced
/// from one [`Meter`].
pub(crate) struct MeterCore {
    rules: MeterRules,
    dispatch: DispatchHandle,
}

impl MeterCore {
    pub(crate) fn rules(&self) -> &MeterRules {
        &self.rules
    }

    /// Build and enqueue the event for a finished request.
    ///
    /// Never fails: unmeterable paths are skipped, queue problems are
    /// logged by the dispatcher. The proxied response is already on its way
    /// when this runs.
    pub(crate) fn record(
        &self,
        snapshot: &RequestSnapshot,
        bytes_received: u64,
        bytes_sent: u64,
        outcome: Outcome,
    ) {
        if let Some(envelope) = self
            .rules
            .build_envelope(snapshot, bytes_received, bytes_sent, outcome)
        {
            debug!(
                target: "meter.event",
                event_id = %envelope.payload.id,
                bytes_received,
                bytes_sent,
                "Recording request"
            );
            self.dispatch.record(envelope);
        }
    }
}

/// Completion hook carried by the response body.
///
/// Holds everything needed to record the event once the response stream is
/// done; `complete` consumes it so recording happens exactly once.
pub(crate) struct ResponseRecorder {
    core: Arc<MeterCore>,
    snapshot: RequestSnapshot,
    received: Arc<AtomicU64>,
}

impl ResponseRecorder {
    pub(crate) fn new(
        core: Arc<MeterCore>,
        snapshot: RequestSnapshot,
        received: Arc<AtomicU64>,
    ) -> Self {
        ResponseRecorder {
            core,
            snapshot,
            received,
        }
    }

    pub(crate) fn complete(self, bytes_sent: u64) {
        let bytes_received = self.received.load(Ordering::Relaxed);
        self.core
            .record(&self.snapshot, bytes_received, bytes_sent, Outcome::Success);
    }
}

/// A configured metering instance.
///
/// Owns the dispatcher task; hand copies of [`Meter::layer`] to every server
/// pipeline that should be metered. Must be created inside a tokio runtime.
///
/// # Example
///
/// ```rust,ignore
/// let config = MeterConfig::from_env()?;
/// let meter = Meter::with_log_notifier(config).await?;
/// let service = ServiceBuilder::new()
///     .layer(meter.layer())
///     .service(proxy);
/// ```
pub struct Meter {
    core: Arc<MeterCore>,
    cancel_token: CancellationToken,
}

impl Meter {
    /// Create a meter publishing through the given notifier.
    ///
    /// When identity credentials are configured, ignored-project names are
    /// resolved to project ids here; unknown names are logged and skipped.
    pub async fn new(config: MeterConfig, notifier: Arc<dyn Notifier>) -> Result<Self, MeterError> {
        let ignore_projects = match &config.identity {
            Some(identity) if !config.ignore_projects.is_empty() => {
                let resolver = ProjectResolver::new(identity.clone())?;
                resolver.resolve(&config.ignore_projects).await?
            }
            _ => config.ignore_projects.clone(),
        };

        let policy = if config.nonblocking_notify && config.send_queue_size > 0 {
            QueuePolicy::Bounded {
                capacity: config.send_queue_size,
            }
        } else {
            QueuePolicy::Unbounded
        };

        let cancel_token = CancellationToken::new();
        let dispatch = dispatch::spawn(
            notifier,
            config.send_timeout,
            policy,
            cancel_token.clone(),
        );

        let rules = MeterRules::new(&config, ignore_projects);

        Ok(Meter {
            core: Arc::new(MeterCore { rules, dispatch }),
            cancel_token,
        })
    }

    /// Create a meter that writes events to the structured log.
    pub async fn with_log_notifier(config: MeterConfig) -> Result<Self, MeterError> {
        Self::new(config, Arc::new(LogNotifier::new())).await
    }

    /// Layer to apply to a server pipeline.
    pub fn layer(&self) -> MeterLayer {
        MeterLayer::new(Arc::clone(&self.core))
    }

    /// Stop the dispatcher task. Queued events are abandoned.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Meter {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
