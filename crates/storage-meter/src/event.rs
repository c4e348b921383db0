//! Audit event construction.
//!
//! [`MeterRules`] holds the per-instance metering policy. A request is first
//! reduced to a [`RequestSnapshot`] (taken before the inner service runs, so
//! the event can still be built after the request has been consumed); once
//! the response body finishes, the snapshot plus byte counts become a CADF
//! event envelope.

use crate::config::{normalize_header_name, MeterConfig};
use crate::extensions::{BackendPath, InternalSource};
use crate::notify::{EventEnvelope, EVENT_TYPE_HTTP_REQUEST};
use crate::path::{strip_leading_slash, StoragePath};
use cadf::{Action, Event, Measurement, Metric, Outcome, Resource};
use std::collections::BTreeMap;
use tracing::debug;

/// CADF type URI for the target resource.
const TARGET_TYPE_URI: &str = "service/storage/object";

/// CADF type URI for the initiator resource.
const INITIATOR_TYPE_URI: &str = "service/security/account/user";

/// Resource id for the observer (the middleware observes on behalf of the
/// target service).
const OBSERVER_ID: &str = "target";

/// Metric name for request-body bytes.
pub const METRIC_INCOMING_BYTES: &str = "storage.objects.incoming.bytes";

/// Metric name for response-body bytes.
pub const METRIC_OUTGOING_BYTES: &str = "storage.objects.outgoing.bytes";

/// Header carrying the user id of the initiator.
const HDR_USER_ID: &str = "x-user-id";

/// Header carrying the service project id (checked first for ignores).
const HDR_SERVICE_PROJECT_ID: &str = "x-service-project-id";

/// Header carrying the project id.
const HDR_PROJECT_ID: &str = "x-project-id";

/// Legacy header carrying the project (tenant) id.
const HDR_TENANT_ID: &str = "x-tenant-id";

/// Per-instance metering policy.
#[derive(Debug)]
pub(crate) struct MeterRules {
    /// Prefix stripped from account names, trailing `_` guaranteed by config.
    pub reseller_prefix: String,

    /// Normalized names of headers copied into event metadata.
    pub metadata_headers: Vec<String>,

    /// Resolved project ids (or verbatim names) whose requests are skipped.
    pub ignore_projects: Vec<String>,

    /// Envelope topic.
    pub topic: String,

    /// Envelope publisher id.
    pub publisher_id: String,
}

impl MeterRules {
    pub(crate) fn new(config: &MeterConfig, ignore_projects: Vec<String>) -> Self {
        MeterRules {
            reseller_prefix: config.reseller_prefix.clone(),
            metadata_headers: config.metadata_headers.clone(),
            ignore_projects,
            topic: config.topic.clone(),
            publisher_id: config.publisher_id.clone(),
        }
    }

    /// Reduce a request to the fields the event needs, or `None` when the
    /// request must not be metered (internal traffic, ignored project).
    pub(crate) fn snapshot<B>(&self, req: &http::Request<B>) -> Option<RequestSnapshot> {
        if let Some(source) = req.extensions().get::<InternalSource>() {
            debug!(
                target: "meter.event",
                source = %source.0,
                "Skipping internally generated request"
            );
            return None;
        }

        let project_for_ignore = header_value(req, HDR_SERVICE_PROJECT_ID)
            .or_else(|| header_value(req, HDR_PROJECT_ID))
            .or_else(|| header_value(req, HDR_TENANT_ID));
        if let Some(project) = project_for_ignore {
            if self.ignore_projects.contains(&project) {
                debug!(
                    target: "meter.event",
                    project_id = %project,
                    "Skipping request from ignored project"
                );
                return None;
            }
        }

        let path = req
            .extensions()
            .get::<BackendPath>()
            .map(|backend| backend.0.clone())
            .unwrap_or_else(|| req.uri().path().to_string());

        let mut metadata = Vec::new();
        if !self.metadata_headers.is_empty() {
            for (name, value) in req.headers() {
                let normalized = normalize_header_name(name.as_str());
                if self.metadata_headers.contains(&normalized) {
                    let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    metadata.push((normalized, value));
                }
            }
        }

        Some(RequestSnapshot {
            method: req.method().as_str().to_string(),
            path,
            user_id: header_value(req, HDR_USER_ID),
            project_id: header_value(req, HDR_PROJECT_ID)
                .or_else(|| header_value(req, HDR_TENANT_ID)),
            metadata,
        })
    }

    /// Build the envelope for a finished request.
    ///
    /// Returns `None` for paths that do not address a storage resource;
    /// such requests pass through unmetered.
    pub(crate) fn build_envelope(
        &self,
        snapshot: &RequestSnapshot,
        bytes_received: u64,
        bytes_sent: u64,
        outcome: Outcome,
    ) -> Option<EventEnvelope> {
        let stripped = strip_leading_slash(&snapshot.path);
        let parsed = StoragePath::parse(&stripped)?;

        let mut metadata: BTreeMap<String, Option<String>> = BTreeMap::new();
        metadata.insert("path".to_string(), Some(stripped.clone()));
        metadata.insert("version".to_string(), Some(parsed.version.clone()));
        metadata.insert("container".to_string(), parsed.container.clone());
        metadata.insert("object".to_string(), parsed.object.clone());
        for (name, value) in &snapshot.metadata {
            metadata.insert(format!("http_header_{}", name), Some(value.clone()));
        }

        let mut target = Resource::typed(
            TARGET_TYPE_URI,
            Some(parsed.resource_id(&stripped, &self.reseller_prefix)),
        );
        target.action = Some(snapshot.method.to_lowercase());
        target.metadata = metadata;

        let mut initiator = Resource::typed(INITIATOR_TYPE_URI, snapshot.user_id.clone());
        initiator.project_id = snapshot.project_id.clone();

        let mut event = Event::new(
            Action::from_method(&snapshot.method),
            outcome,
            initiator,
            target,
            Resource::new(OBSERVER_ID),
        );

        if bytes_received > 0 {
            event.add_measurement(Measurement::new(
                bytes_received,
                Metric::new(METRIC_INCOMING_BYTES, "B"),
            ));
        }
        if bytes_sent > 0 {
            event.add_measurement(Measurement::new(
                bytes_sent,
                Metric::new(METRIC_OUTGOING_BYTES, "B"),
            ));
        }

        Some(EventEnvelope {
            event_type: EVENT_TYPE_HTTP_REQUEST.to_string(),
            publisher_id: self.publisher_id.clone(),
            topic: self.topic.clone(),
            payload: event,
        })
    }
}

/// Request fields captured before the inner service consumes the request.
#[derive(Debug, Clone)]
pub(crate) struct RequestSnapshot {
    /// Request method, verbatim.
    pub method: String,

    /// Storage path (backend path when the request was rewritten).
    pub path: String,

    /// Initiating user id, when supplied by the auth layer.
    pub user_id: Option<String>,

    /// Project the request was made on behalf of.
    pub project_id: Option<String>,

    /// Configured metadata headers present on the request, normalized.
    pub metadata: Vec<(String, String)>,
}

fn header_value<B>(req: &http::Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
