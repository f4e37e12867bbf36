//! Parsed request representation.

use std::collections::BTreeMap;

/// One parsed HTTP request. Immutable once constructed; scoped to a single
/// parser invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    verb: String,
    path: String,
    headers: BTreeMap<String, String>,
}

impl HttpRequest {
    pub fn new(verb: String, path: String, headers: BTreeMap<String, String>) -> Self {
        Self { verb, path, headers }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header names are kept case-sensitive as received. Iteration order is
    /// by name, which keeps the status report deterministic.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}
