//! Collaborator traits consumed by the core
//!
//! The core never talks to the network directly: the OAuth provider and
//! the HTTP transport are injected behind these traits, which keeps the
//! state machine testable without a live DMPRoadmap instance.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn OAuthProvider>`, `Arc<dyn Transport>`).

use std::future::Future;
use std::pin::Pin;

use roadmap_auth::AccessToken;

use crate::operation::HttpMethod;

/// Boxed future alias used by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// OAuth provider collaborator: the two grant protocols plus consent URL
/// construction. The concrete implementation carries the credentials and
/// redirect URI; the core only chooses which operation to invoke.
///
/// Each grant operation reports an expired grant as a distinguishable
/// `roadmap_auth::Error::InvalidGrant`.
pub trait OAuthProvider: Send + Sync {
    /// Mint a client-level token via the client-credentials grant.
    fn client_credentials_token<'a>(
        &'a self,
        scope: &'a str,
    ) -> BoxFuture<'a, roadmap_auth::Result<AccessToken>>;

    /// Build the consent URL for the authorization-code grant.
    fn build_authorization_url(&self, scope: &str) -> String;

    /// Exchange an authorization code for a user-level token.
    fn exchange_code<'a>(&'a self, code: &'a str)
    -> BoxFuture<'a, roadmap_auth::Result<AccessToken>>;
}

/// One outgoing HTTP request, fully resolved.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Status and raw body of an upstream response. Non-2xx statuses are not
/// transport errors; the runner interprets them.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failure (connection refused, DNS, timeout).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// HTTP transport collaborator: send a request, return status + body.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, std::result::Result<TransportResponse, TransportError>>;
}
