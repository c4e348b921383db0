//! CADF taxonomy actions.
//!
//! Maps HTTP request methods onto the CADF action taxonomy. Methods outside
//! the taxonomy map to `unknown` rather than failing, so arbitrary request
//! methods can still be audited.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CADF taxonomy action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read-only access (GET, HEAD).
    Read,
    /// Resource creation or mutation (PUT, POST, PATCH).
    Update,
    /// Resource removal (DELETE).
    Delete,
    /// Any method outside the taxonomy.
    Unknown,
}

impl Action {
    /// Derive the taxonomy action from an HTTP method name.
    ///
    /// The method is matched case-insensitively.
    pub fn from_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" => Action::Read,
            "PUT" | "POST" | "PATCH" => Action::Update,
            "DELETE" => Action::Delete,
            _ => Action::Unknown,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_methods() {
        assert_eq!(Action::from_method("GET"), Action::Read);
        assert_eq!(Action::from_method("HEAD"), Action::Read);
        assert_eq!(Action::from_method("get"), Action::Read);
    }

    #[test]
    fn test_update_methods() {
        assert_eq!(Action::from_method("PUT"), Action::Update);
        assert_eq!(Action::from_method("POST"), Action::Update);
        assert_eq!(Action::from_method("PATCH"), Action::Update);
    }

    #[test]
    fn test_delete_method() {
        assert_eq!(Action::from_method("DELETE"), Action::Delete);
    }

    #[test]
    fn test_unknown_method() {
        assert_eq!(Action::from_method("BOGUS"), Action::Unknown);
        assert_eq!(Action::from_method(""), Action::Unknown);
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_value(Action::Read).unwrap();
        assert_eq!(json, "read");
        let json = serde_json::to_value(Action::Unknown).unwrap();
        assert_eq!(json, "unknown");
    }
}
