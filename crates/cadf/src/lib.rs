//! CADF (DMTF Cloud Auditing Data Federation) activity events.
//!
//! Minimal event model for the metering middleware: activity events with an
//! initiator, a target, an observer, an outcome, and optional byte-count
//! measurements. Field names follow the CADF wire format (`typeURI`,
//! `eventType`, `eventTime`) so downstream telemetry consumers can ingest
//! the JSON without translation.

/// Module for CADF taxonomy actions derived from HTTP methods
pub mod action;

/// Module for the activity event type
pub mod event;

/// Module for measurements and metrics
pub mod measurement;

/// Module for event resources (initiator, target, observer)
pub mod resource;

pub use action::Action;
pub use event::{Event, Outcome};
pub use measurement::{Measurement, Metric};
pub use resource::Resource;
