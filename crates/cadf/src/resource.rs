//! Event resources.
//!
//! A `Resource` describes one party to an audited interaction: the initiator
//! (who made the request), the target (what was acted upon) and the observer
//! (who recorded the event). Only populated fields are serialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One party to an audited interaction.
///
/// `metadata` values are `Option<String>` so structurally-absent fields
/// (e.g. an account-level request has no container or object) serialize as
/// explicit nulls, which consumers distinguish from a missing key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// CADF type URI (e.g. `service/storage/object`).
    #[serde(rename = "typeURI", skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,

    /// Lower-cased request method, set on target resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Project the initiator acted on behalf of.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Free-form resource metadata.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub metadata: BTreeMap<String, Option<String>>,
}

impl Resource {
    /// Create a resource with an id and no type.
    pub fn new(id: impl Into<String>) -> Self {
        Resource {
            id: Some(id.into()),
            ..Resource::default()
        }
    }

    /// Create a resource with an id and a CADF type URI.
    pub fn typed(type_uri: impl Into<String>, id: Option<String>) -> Self {
        Resource {
            id,
            type_uri: Some(type_uri.into()),
            ..Resource::default()
        }
    }
}
