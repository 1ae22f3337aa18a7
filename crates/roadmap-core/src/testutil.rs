//! Shared mock collaborators for core tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use roadmap_auth::AccessToken;

use crate::operation::HttpMethod;
use crate::provider::{
    BoxFuture, OAuthProvider, Transport, TransportError, TransportRequest, TransportResponse,
};

/// Fixed consent URL prefix the mock provider hands out.
pub const MOCK_AUTHORIZE_ENDPOINT: &str = "https://provider.example/oauth/authorize";

/// Redirect URI baked into mock consent URLs.
pub const MOCK_REDIRECT_URI: &str = "http://localhost:4567/oauth2/callback";

pub fn token(value: &str) -> AccessToken {
    AccessToken {
        value: value.to_owned(),
        token_type: "Bearer".to_owned(),
        expiry: None,
        scope: "public read_dmps edit_dmps".to_owned(),
    }
}

/// Scriptable OAuth provider that counts grant calls.
///
/// `exchange_results` is consumed front to back; when empty, exchanges
/// succeed with a token derived from the code. `client_results` works the
/// same way for the client-credentials grant.
#[derive(Default)]
pub struct MockProvider {
    pub client_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub client_results: Mutex<VecDeque<roadmap_auth::Result<AccessToken>>>,
    pub exchange_results: Mutex<VecDeque<roadmap_auth::Result<AccessToken>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_exchange(&self, result: roadmap_auth::Result<AccessToken>) {
        self.exchange_results.lock().unwrap().push_back(result);
    }

    pub fn queue_client(&self, result: roadmap_auth::Result<AccessToken>) {
        self.client_results.lock().unwrap().push_back(result);
    }
}

impl OAuthProvider for MockProvider {
    fn client_credentials_token<'a>(
        &'a self,
        _scope: &'a str,
    ) -> BoxFuture<'a, roadmap_auth::Result<AccessToken>> {
        self.client_calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .client_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(token("client-token")));
        Box::pin(async move { result })
    }

    fn build_authorization_url(&self, scope: &str) -> String {
        format!(
            "{MOCK_AUTHORIZE_ENDPOINT}?client_id=client-123&redirect_uri={MOCK_REDIRECT_URI}&response_type=code&scope={scope}"
        )
    }

    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
    ) -> BoxFuture<'a, roadmap_auth::Result<AccessToken>> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .exchange_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(token(&format!("user-{code}"))));
        Box::pin(async move { result })
    }
}

/// Canned-response transport that records every request it sees.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, TransportResponse>>,
    pub requests: Mutex<Vec<TransportRequest>>,
    pub fail_all: std::sync::atomic::AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: HttpMethod, url: &str, status: u16, body: &str) {
        self.responses.lock().unwrap().insert(
            format!("{} {url}", method.as_str()),
            TransportResponse {
                status,
                body: body.to_owned(),
            },
        );
    }

    pub fn sent_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Box::pin(async { Err(TransportError("connection refused".into())) });
        }
        let key = format!("{} {}", request.method.as_str(), request.url);
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(TransportResponse {
                status: 404,
                body: r#"{"error":"not found"}"#.to_owned(),
            });
        self.requests.lock().unwrap().push(request);
        Box::pin(async move { Ok(response) })
    }
}
