//! Measurements attached to activity events.

use serde::{Deserialize, Serialize};

/// Named metric with a unit (e.g. `storage.objects.incoming.bytes` / `B`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name.
    pub name: String,

    /// Metric unit.
    pub unit: String,
}

impl Metric {
    /// Create a metric from a name and unit.
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Metric {
            name: name.into(),
            unit: unit.into(),
        }
    }
}

/// A single measured value for a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Measured value.
    pub result: u64,

    /// Metric the value belongs to.
    pub metric: Metric,
}

impl Measurement {
    /// Create a measurement.
    pub fn new(result: u64, metric: Metric) -> Self {
        Measurement { result, metric }
    }
}
