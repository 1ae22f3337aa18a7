//! Test execution
//!
//! Given a catalog operation, obtains the right token from the
//! authorization manager, resolves any `{id}` placeholder from a prior
//! list fetch, issues the request through the transport collaborator, and
//! normalizes the response. Upstream non-2xx statuses and undecodable
//! bodies are results, not faults.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::manager::{AuthorizationManager, TokenOutcome};
use crate::operation::{HttpMethod, PayloadContext, TestOperation, TokenScope};
use crate::provider::{Transport, TransportRequest, TransportResponse};
use crate::store::{TokenStore, TokenStoreExt, keys};
use roadmap_auth::AccessToken;

/// Paths with these extensions return documents; their bodies are kept raw
/// instead of being JSON-decoded.
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf"];

/// Normalized outcome of one test request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TestResult {
    pub status: u16,
    /// Decoded JSON body, when the response was JSON and decodable.
    pub body: Option<Value>,
    /// Raw body for document responses and for bodies that failed to
    /// decode.
    pub raw: Option<String>,
    pub error: Option<String>,
}

/// What the caller should do next: render a completed result, or answer
/// the browser with a redirect to the provider consent page. The redirect
/// suspends the whole logical operation until the callback arrives.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(TestResult),
    Redirect(String),
}

pub struct TestRunner {
    auth: Arc<AuthorizationManager>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    api_base: String,
}

impl TestRunner {
    pub fn new(
        auth: Arc<AuthorizationManager>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        api_base: impl Into<String>,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            auth,
            transport,
            store,
            api_base: api_base.trim_end_matches('/').to_owned(),
        }
    }

    /// Execute one operation end to end.
    pub async fn run(&self, operation: &TestOperation) -> Result<RunOutcome> {
        let token = match operation.scope {
            TokenScope::Client => self.auth.client_token().await?,
            TokenScope::User => match self.auth.user_token(&operation.id).await? {
                TokenOutcome::Token(token) => token,
                TokenOutcome::RedirectRequired(url) => {
                    // Suspension point: the request is not issued.
                    return Ok(RunOutcome::Redirect(url));
                }
            },
        };

        let (path, resolved_id) = self.resolve_path(operation, &token).await?;
        let url = format!("{}{}", self.api_base, path);

        let body = operation.payload.map(|build| {
            build(&PayloadContext {
                api_base: &self.api_base,
                resolved_id: resolved_id.as_deref(),
            })
            .to_string()
        });

        info!(
            operation = operation.id,
            method = operation.method.as_str(),
            url,
            "issuing test request"
        );
        let response = self
            .transport
            .send(TransportRequest {
                method: operation.method,
                url: url.clone(),
                headers: request_headers(&token),
                body,
            })
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(RunOutcome::Completed(self.interpret(&url, &path, response)))
    }

    /// Resolve an `{id}` placeholder (or an explicit id source) via a GET
    /// against the list endpoint, taking the last listed resource.
    async fn resolve_path(
        &self,
        operation: &TestOperation,
        token: &AccessToken,
    ) -> Result<(String, Option<String>)> {
        let Some(list_path) = operation.list_path() else {
            return Ok((operation.path_template.clone(), None));
        };

        let list_url = format!("{}{}", self.api_base, list_path);
        debug!(operation = operation.id, list_url, "resolving resource id");
        let response = self
            .transport
            .send(TransportRequest {
                method: HttpMethod::Get,
                url: list_url.clone(),
                headers: request_headers(token),
                body: None,
            })
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !is_success(response.status) {
            return Err(Error::IdentifierResolution(format!(
                "list fetch {list_url} returned {}",
                response.status
            )));
        }

        let listing: Value = serde_json::from_str(&response.body).map_err(|e| {
            Error::IdentifierResolution(format!("list response was not valid JSON: {e}"))
        })?;
        let id = extract_last_item_id(&listing)?;

        Ok((
            operation.path_template.replace("{id}", &id),
            Some(id),
        ))
    }

    /// Turn a raw upstream response into a `TestResult`.
    fn interpret(&self, url: &str, path: &str, response: TransportResponse) -> TestResult {
        let status = response.status;
        let mut error = if is_success(status) {
            None
        } else {
            let message = format!("Unexpected response from the API for {url} - {status}");
            warn!(status, url, "upstream returned a non-success status");
            self.store.set_str(keys::LAST_ERROR, &message);
            Some(message)
        };

        if is_document_path(path) {
            return TestResult {
                status,
                body: None,
                raw: Some(response.body),
                error,
            };
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(decoded) => TestResult {
                status,
                body: Some(decoded),
                raw: None,
                error,
            },
            Err(e) => {
                let parse_message =
                    format!("Unable to parse JSON response from the API for {url}: {e}");
                warn!(status, url, "response body was not valid JSON");
                error = Some(match error {
                    Some(upstream) => format!("{upstream}; {parse_message}"),
                    None => parse_message,
                });
                TestResult {
                    status,
                    body: None,
                    raw: Some(response.body),
                    error,
                }
            }
        }
    }
}

fn is_success(status: u16) -> bool {
    matches!(status, 200 | 201)
}

fn request_headers(token: &AccessToken) -> Vec<(String, String)> {
    vec![
        ("Accept".to_owned(), "application/json".to_owned()),
        ("Content-Type".to_owned(), "application/json".to_owned()),
        ("Authorization".to_owned(), token.authorization_header()),
    ]
}

fn is_document_path(path: &str) -> bool {
    DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Derive the last listed resource's identifier from a `{items: [...]}`
/// response: descend into the item's `dmp.dmproadmap_links` mapping, take
/// the `get` (or `download`) URL, keep the path segment after the last `/`,
/// and strip a trailing file extension. An empty list or missing link is a
/// lookup failure, never a garbage substitution.
pub fn extract_last_item_id(listing: &Value) -> Result<String> {
    let last = listing
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.last())
        .ok_or_else(|| {
            Error::IdentifierResolution("list response contained no items".into())
        })?;

    let links = last
        .get("dmp")
        .and_then(|dmp| dmp.get("dmproadmap_links"))
        .ok_or_else(|| {
            Error::IdentifierResolution("last item has no dmproadmap_links".into())
        })?;

    let link = links
        .get("get")
        .or_else(|| links.get("download"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::IdentifierResolution("dmproadmap_links has no get or download URL".into())
        })?;

    let segment = link
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let id = strip_extension(segment);

    if id.is_empty() {
        return Err(Error::IdentifierResolution(format!(
            "could not derive an id from link {link}"
        )));
    }
    Ok(id.to_owned())
}

/// Strip a trailing `.ext` when the extension is purely alphabetic, so
/// `42.json` becomes `42` but a bare `42` is untouched.
fn strip_extension(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(at)
            if at > 0
                && segment[at + 1..]
                    .chars()
                    .all(|c| c.is_ascii_alphabetic()) =>
        {
            &segment[..at]
        }
        _ => segment,
    }
}
