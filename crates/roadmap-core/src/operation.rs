//! Test operations and the catalog
//!
//! A `TestOperation` is an immutable definition of one named API test:
//! method + path template + required token scope, with an optional payload
//! builder for POST bodies. The catalog maps submitted operation ids to
//! definitions; the UI layer owns its contents, the core only interprets
//! them.

use std::collections::HashMap;

use serde_json::Value;

/// HTTP methods the console issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Which token a test runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// Client-credentials token; no user interaction, never redirects.
    Client,
    /// User authorization token; may suspend into a consent redirect.
    User,
}

/// Context handed to a payload builder after path resolution.
pub struct PayloadContext<'a> {
    /// API base URL, e.g. `https://host/api/v2`.
    pub api_base: &'a str,
    /// Resource id resolved from a prior list fetch, when the operation
    /// required one.
    pub resolved_id: Option<&'a str>,
}

/// Builds a JSON request body for a POST operation.
pub type PayloadFn = fn(&PayloadContext<'_>) -> Value;

/// One named API test.
#[derive(Debug, Clone)]
pub struct TestOperation {
    pub id: String,
    pub method: HttpMethod,
    /// Path under the API base; may contain an `{id}` placeholder that is
    /// resolved from the placeholder-stripped list endpoint.
    pub path_template: String,
    pub scope: TokenScope,
    pub payload: Option<PayloadFn>,
    /// List endpoint to resolve an id from even when the template itself
    /// has no placeholder (used by tests whose payload references a
    /// resolved resource).
    pub id_list_path: Option<String>,
}

impl TestOperation {
    pub fn new(
        id: &str,
        method: HttpMethod,
        path_template: &str,
        scope: TokenScope,
    ) -> Self {
        Self {
            id: id.to_owned(),
            method,
            path_template: path_template.to_owned(),
            scope,
            payload: None,
            id_list_path: None,
        }
    }

    pub fn with_payload(mut self, payload: PayloadFn) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_id_list_path(mut self, path: &str) -> Self {
        self.id_list_path = Some(path.to_owned());
        self
    }

    /// The list endpoint this operation resolves its id from, if any:
    /// either the explicit `id_list_path` or the template up to `/{id}`.
    pub fn list_path(&self) -> Option<String> {
        if let Some(path) = &self.id_list_path {
            return Some(path.clone());
        }
        self.path_template
            .find("/{id}")
            .map(|at| self.path_template[..at].to_owned())
    }
}

/// Operation catalog keyed by id.
#[derive(Debug, Default)]
pub struct Catalog {
    operations: HashMap<String, TestOperation>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, operation: TestOperation) {
        self.operations.insert(operation.id.clone(), operation);
    }

    pub fn get(&self, id: &str) -> Option<&TestOperation> {
        self.operations.get(id)
    }

    /// Operation ids in stable order, for form rendering.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_path_derives_from_placeholder() {
        let op = TestOperation::new("plan", HttpMethod::Get, "/plans/{id}", TokenScope::Client);
        assert_eq!(op.list_path().as_deref(), Some("/plans"));

        let pdf = TestOperation::new(
            "plan_pdf",
            HttpMethod::Get,
            "/plans/{id}.pdf",
            TokenScope::Client,
        );
        assert_eq!(pdf.list_path().as_deref(), Some("/plans"));
    }

    #[test]
    fn explicit_id_list_path_wins() {
        let op = TestOperation::new(
            "add_doi",
            HttpMethod::Post,
            "/related_identifiers",
            TokenScope::User,
        )
        .with_id_list_path("/plans");
        assert_eq!(op.list_path().as_deref(), Some("/plans"));
    }

    #[test]
    fn plain_path_needs_no_resolution() {
        let op = TestOperation::new("plans", HttpMethod::Get, "/plans", TokenScope::Client);
        assert!(op.list_path().is_none());
    }

    #[test]
    fn catalog_lookup_and_stable_ids() {
        let mut catalog = Catalog::new();
        catalog.insert(TestOperation::new(
            "b_test",
            HttpMethod::Get,
            "/b",
            TokenScope::Client,
        ));
        catalog.insert(TestOperation::new(
            "a_test",
            HttpMethod::Get,
            "/a",
            TokenScope::User,
        ));

        assert_eq!(catalog.ids(), vec!["a_test", "b_test"]);
        assert!(catalog.get("a_test").is_some());
        assert!(catalog.get("missing").is_none());
    }
}
