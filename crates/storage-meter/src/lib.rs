//! Usage metering middleware for object-storage HTTP proxies.
//!
//! Wraps a proxy's request pipeline and, for every proxied request, counts
//! request and response body bytes, parses the storage path
//! (`/<version>/<account>[/<container>[/<object>]]`), builds a CADF activity
//! event and publishes it to a telemetry pipeline through a pluggable
//! notifier.
//!
//! # Architecture
//!
//! ```text
//! middleware (layer + counting bodies)
//!     -> event (snapshot + envelope construction)
//!     -> dispatch (queue + background task)
//!     -> notify (log / http / channel drivers)
//! ```
//!
//! Telemetry never interferes with proxied traffic: events are recorded
//! after the response stream finishes, publish failures are logged and
//! retried in the background, and a full queue drops events rather than
//! applying backpressure.
//!
//! # Modules
//!
//! - `config` - Configuration from environment variables
//! - `errors` - Meter construction errors
//! - `extensions` - Request extensions (internal traffic, rewritten paths)
//! - `identity` - Identity-service client for ignored-project resolution
//! - `middleware` - Tower layer and byte-counting bodies
//! - `notify` - Notifier trait and drivers

pub mod config;
pub mod errors;
pub mod extensions;
pub mod identity;
pub mod middleware;
pub mod notify;

mod dispatch;
mod event;
mod meter;
mod path;

pub use config::{ConfigError, IdentityConfig, MeterConfig};
pub use errors::MeterError;
pub use event::{METRIC_INCOMING_BYTES, METRIC_OUTGOING_BYTES};
pub use extensions::{BackendPath, InternalSource};
pub use meter::Meter;
pub use middleware::{MeterLayer, MeterService};
pub use notify::{
    ChannelNotifier, EventEnvelope, HttpNotifier, LogNotifier, Notifier, NotifyError,
    EVENT_TYPE_HTTP_REQUEST,
};
