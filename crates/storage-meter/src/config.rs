//! Middleware configuration.
//!
//! Configuration is loaded from environment variables (`METER_*`) or from a
//! plain key/value map in tests. Invalid values fail loading rather than
//! falling back silently, so a misconfigured deployment is caught at startup
//! instead of dropping telemetry at runtime.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default reseller prefix stripped from account names.
pub const DEFAULT_RESELLER_PREFIX: &str = "AUTH_";

/// Default notification topic.
pub const DEFAULT_TOPIC: &str = "notifications";

/// Default publisher id attached to every envelope.
pub const DEFAULT_PUBLISHER_ID: &str = "storage-meter";

/// Default per-attempt publish timeout in seconds.
pub const DEFAULT_SEND_TIMEOUT_SECONDS: u64 = 10;

/// Default background queue capacity (0 = unbounded).
pub const DEFAULT_SEND_QUEUE_SIZE: usize = 1000;

/// Identity service credentials for resolving ignored project names to ids.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Identity service base URL (e.g. `https://keystone:5000`).
    pub url: String,

    /// Service account user name.
    pub username: String,

    /// Service account password.
    pub password: String,

    /// Project the service account authenticates against.
    pub project_name: String,
}

/// Metering middleware configuration.
///
/// Loaded from environment variables with sensible defaults. The identity
/// block is optional; without it, ignored-project entries are matched
/// verbatim.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// Prefix stripped from account names to form the target resource id.
    /// Non-empty values are normalized to end with `_`.
    pub reseller_prefix: String,

    /// Request headers copied into event metadata, normalized to
    /// lowercase with underscores.
    pub metadata_headers: Vec<String>,

    /// Project ids or names whose requests are not metered.
    pub ignore_projects: Vec<String>,

    /// Notification topic.
    pub topic: String,

    /// Publisher id attached to every envelope.
    pub publisher_id: String,

    /// When true, events are queued to the background dispatcher and
    /// discarded if the queue is full; when false, no event is ever dropped.
    pub nonblocking_notify: bool,

    /// Per-attempt publish timeout; timed-out sends are retried.
    pub send_timeout: Duration,

    /// Background queue capacity. `0` means unbounded.
    pub send_queue_size: usize,

    /// Optional identity service credentials.
    pub identity: Option<IdentityConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid METER_NONBLOCKING_NOTIFY: {0}")]
    InvalidNonblockingNotify(String),

    #[error("Invalid METER_SEND_TIMEOUT_SECONDS: {0}")]
    InvalidSendTimeout(String),

    #[error("Invalid METER_SEND_QUEUE_SIZE: {0}")]
    InvalidSendQueueSize(String),

    #[error("Incomplete identity configuration: missing {0}")]
    IncompleteIdentity(String),
}

impl MeterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let reseller_prefix = normalize_reseller_prefix(
            vars.get("METER_RESELLER_PREFIX")
                .map(String::as_str)
                .unwrap_or(DEFAULT_RESELLER_PREFIX),
        );

        let metadata_headers = vars
            .get("METER_METADATA_HEADERS")
            .map(String::as_str)
            .unwrap_or("")
            .split(',')
            .filter_map(|h| {
                let h = h.trim();
                if h.is_empty() {
                    None
                } else {
                    Some(normalize_header_name(h))
                }
            })
            .collect();

        let ignore_projects = split_list(
            vars.get("METER_IGNORE_PROJECTS")
                .map(String::as_str)
                .unwrap_or(""),
        );

        let topic = vars
            .get("METER_TOPIC")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());

        let publisher_id = vars
            .get("METER_PUBLISHER_ID")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PUBLISHER_ID.to_string());

        let nonblocking_notify = match vars.get("METER_NONBLOCKING_NOTIFY") {
            None => false,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => {
                    return Err(ConfigError::InvalidNonblockingNotify(format!(
                        "expected true or false, got '{}'",
                        other
                    )))
                }
            },
        };

        // Parse send timeout with validation
        let send_timeout = if let Some(value_str) = vars.get("METER_SEND_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidSendTimeout(format!(
                    "METER_SEND_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidSendTimeout(
                    "METER_SEND_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECONDS)
        };

        // Parse queue size; 0 is a valid value meaning unbounded
        let send_queue_size = if let Some(value_str) = vars.get("METER_SEND_QUEUE_SIZE") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidSendQueueSize(format!(
                    "METER_SEND_QUEUE_SIZE must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            DEFAULT_SEND_QUEUE_SIZE
        };

        let identity = identity_from_vars(vars)?;

        Ok(MeterConfig {
            reseller_prefix,
            metadata_headers,
            ignore_projects,
            topic,
            publisher_id,
            nonblocking_notify,
            send_timeout,
            send_queue_size,
            identity,
        })
    }
}

/// Parse the optional identity block; all four variables must be present
/// together or absent together.
fn identity_from_vars(vars: &HashMap<String, String>) -> Result<Option<IdentityConfig>, ConfigError> {
    let url = vars.get("METER_IDENTITY_URL");
    let username = vars.get("METER_IDENTITY_USERNAME");
    let password = vars.get("METER_IDENTITY_PASSWORD");
    let project_name = vars.get("METER_IDENTITY_PROJECT_NAME");

    match (url, username, password, project_name) {
        (None, None, None, None) => Ok(None),
        (Some(url), Some(username), Some(password), Some(project_name)) => {
            Ok(Some(IdentityConfig {
                url: url.clone(),
                username: username.clone(),
                password: password.clone(),
                project_name: project_name.clone(),
            }))
        }
        _ => {
            let missing = [
                ("METER_IDENTITY_URL", url),
                ("METER_IDENTITY_USERNAME", username),
                ("METER_IDENTITY_PASSWORD", password),
                ("METER_IDENTITY_PROJECT_NAME", project_name),
            ]
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
            Err(ConfigError::IncompleteIdentity(missing))
        }
    }
}

/// Normalize the reseller prefix: a non-empty prefix always ends with `_`.
fn normalize_reseller_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('_') {
        prefix.to_string()
    } else {
        format!("{}_", prefix)
    }
}

/// Normalize a metadata header name to lowercase with underscores.
pub(crate) fn normalize_header_name(name: &str) -> String {
    name.trim().replace('-', "_").to_ascii_lowercase()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
