//! Request extensions consulted by the middleware.

/// Marks a request as internally generated (replication, audit sweeps,
/// sub-requests issued by sibling middleware). Marked requests are never
/// metered. The string names the originating component, for debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalSource(pub String);

impl InternalSource {
    /// Mark a request as originating from `component`.
    pub fn new(component: impl Into<String>) -> Self {
        InternalSource(component.into())
    }
}

/// Overrides the path used for storage-path parsing.
///
/// S3-compatibility front-ends rewrite the visible URI path; they store the
/// real backend path (`/<version>/<account>/...`) in this extension so
/// metering still attributes the request correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendPath(pub String);

impl BackendPath {
    /// Record the backend storage path for a rewritten request.
    pub fn new(path: impl Into<String>) -> Self {
        BackendPath(path.into())
    }
}
