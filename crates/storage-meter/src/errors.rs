//! Top-level error type for meter construction.
//!
//! Runtime telemetry errors never surface here: once a [`crate::Meter`] is
//! built, publish failures are logged by the dispatcher and the proxied
//! traffic is unaffected.

use crate::config::ConfigError;
use crate::identity::IdentityError;
use thiserror::Error;

/// Errors that can prevent a meter from being constructed.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity service error: {0}")]
    Identity(#[from] IdentityError),
}
