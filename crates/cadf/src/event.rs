//! CADF activity events.

use crate::action::Action;
use crate::measurement::Measurement;
use crate::resource::Resource;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// CADF type URI for activity events.
pub const EVENT_TYPE_URI: &str = "http://schemas.dmtf.org/cloud/audit/1.0/event";

/// CADF event type for activity events.
pub const EVENT_TYPE_ACTIVITY: &str = "activity";

/// Outcome of the audited interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The interaction completed.
    Success,
    /// The interaction failed before a response was produced.
    Failure,
}

/// A CADF activity event.
///
/// Captures one audited interaction: who (`initiator`) did what (`action`)
/// to what (`target`), observed by whom (`observer`), with what `outcome`,
/// and optionally how many bytes moved (`measurements`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: String,

    /// CADF schema type URI.
    #[serde(rename = "typeURI")]
    pub type_uri: String,

    /// CADF event type, always `activity` for this crate.
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// RFC 3339 UTC timestamp taken at event construction.
    #[serde(rename = "eventTime")]
    pub event_time: String,

    /// Taxonomy action derived from the request method.
    pub action: Action,

    /// Interaction outcome.
    pub outcome: Outcome,

    /// Party that made the request.
    pub initiator: Resource,

    /// Resource the request acted upon.
    pub target: Resource,

    /// Party that recorded the event.
    pub observer: Resource,

    /// Byte-count measurements; omitted entirely when empty.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub measurements: Vec<Measurement>,
}

impl Event {
    /// Create an activity event timestamped now.
    pub fn new(
        action: Action,
        outcome: Outcome,
        initiator: Resource,
        target: Resource,
        observer: Resource,
    ) -> Self {
        Event {
            id: Uuid::new_v4().to_string(),
            type_uri: EVENT_TYPE_URI.to_string(),
            event_type: EVENT_TYPE_ACTIVITY.to_string(),
            event_time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            action,
            outcome,
            initiator,
            target,
            observer,
            measurements: Vec::new(),
        }
    }

    /// Attach a measurement to the event.
    pub fn add_measurement(&mut self, measurement: Measurement) {
        self.measurements.push(measurement);
    }
}
