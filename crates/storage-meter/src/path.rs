//! Storage path parsing.
//!
//! Proxy paths have the shape `/<version>/<account>[/<container>[/<object>]]`.
//! Object names may themselves contain `/`. Paths without both a version and
//! an account are not meterable and parse to `None`.

/// Parsed storage path components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    /// API version segment.
    pub version: String,

    /// Account segment, reseller prefix included.
    pub account: String,

    /// Container segment, absent for account-level requests.
    pub container: Option<String>,

    /// Object name (may contain `/`), absent for account and container
    /// level requests.
    pub object: Option<String>,
}

impl StoragePath {
    /// Parse a path that has already had its leading `/` removed
    /// (see [`strip_leading_slash`]).
    pub fn parse(stripped: &str) -> Option<Self> {
        let (version, rest) = stripped.split_once('/')?;
        let (account, remainder) = match rest.split_once('/') {
            Some((account, remainder)) => (account, Some(remainder)),
            None => (rest, None),
        };

        if version.is_empty() || account.is_empty() {
            return None;
        }

        let (container, object) = match remainder {
            None | Some("") => (None, None),
            Some(rem) => match rem.split_once('/') {
                Some((container, object)) => (Some(container), Some(object)),
                None => (Some(rem), None),
            },
        };

        Some(StoragePath {
            version: version.to_string(),
            account: account.to_string(),
            container: container.map(str::to_string),
            object: object.map(str::to_string),
        })
    }

    /// Target resource id: the account with the reseller prefix stripped.
    ///
    /// When the prefix does not occur in the account (or stripping would
    /// leave an empty id), the full stripped path is used instead so the
    /// event still carries a non-empty identifier.
    pub fn resource_id(&self, stripped_path: &str, reseller_prefix: &str) -> String {
        match self.account.split_once(reseller_prefix) {
            Some((_, after)) if !after.is_empty() => after.to_string(),
            _ => stripped_path.to_string(),
        }
    }
}

/// Remove the first `/` from a path, mirroring how proxy paths are keyed.
pub fn strip_leading_slash(path: &str) -> String {
    match path.split_once('/') {
        Some((before, after)) => format!("{}{}", before, after),
        None => path.to_string(),
    }
}
