//! OAuth token minting
//!
//! Handles the two token endpoint interactions:
//! 1. Client-credentials grant (the ApiClient's own authorization)
//! 2. Authorization-code exchange (a user's delegated authorization)
//!
//! Both POST to `{host}/oauth/token` with different grant types. Provider
//! rejections are classified from the JSON error body: an `invalid_grant`
//! code becomes `Error::InvalidGrant`, everything else `GrantRejected`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Raw response from the token endpoint for both grant types.
///
/// `expires_in` is a delta in seconds from the response time; callers
/// convert it to an absolute timestamp when caching the token.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

/// A minted access token as cached in the session store.
///
/// `expiry` is an absolute unix timestamp in seconds, computed at mint
/// time from `TokenResponse.expires_in`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub token_type: String,
    pub expiry: Option<u64>,
    pub scope: String,
}

impl AccessToken {
    /// Convert a token endpoint response into a cacheable token.
    pub fn from_response(response: TokenResponse, now: u64) -> Self {
        Self {
            value: response.access_token,
            token_type: response.token_type,
            expiry: response.expires_in.map(|delta| now + delta),
            scope: response.scope.unwrap_or_default(),
        }
    }

    /// `Authorization` header value: `{token_type} {value}`.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }

    /// A token with no recorded expiry never counts as expired here; the
    /// API itself is the authority in that case.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry.is_some_and(|at| at <= now)
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Mint a token for the ApiClient itself via the client-credentials grant.
pub async fn client_credentials_token(
    client: &reqwest::Client,
    credentials: &Credentials,
    scope: &str,
) -> Result<AccessToken> {
    debug!(host = credentials.host(), "requesting client-credentials token");
    let response = post_token_request(
        client,
        &credentials.token_endpoint(),
        &[
            ("grant_type", "client_credentials"),
            ("client_id", &credentials.client_id),
            ("client_secret", credentials.client_secret.expose()),
            ("scope", scope),
        ],
    )
    .await?;
    Ok(AccessToken::from_response(response, unix_now()))
}

/// Exchange an authorization code for a user-level token.
///
/// The code is single-use on the provider side; callers must discard it
/// after this returns, success or not.
pub async fn exchange_code(
    client: &reqwest::Client,
    credentials: &Credentials,
    code: &str,
    redirect_uri: &str,
) -> Result<AccessToken> {
    debug!(host = credentials.host(), "exchanging authorization code");
    let response = post_token_request(
        client,
        &credentials.token_endpoint(),
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &credentials.client_id),
            ("client_secret", credentials.client_secret.expose()),
        ],
    )
    .await?;
    Ok(AccessToken::from_response(response, unix_now()))
}

async fn post_token_request(
    client: &reqwest::Client,
    endpoint: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = client
        .post(endpoint)
        .form(params)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(classify_rejection(status.as_u16(), &body));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenParse(format!("token endpoint returned invalid JSON: {e}")))
}

/// Classify a token endpoint rejection from its JSON error body.
///
/// RFC 6749 error bodies look like `{"error":"invalid_grant",
/// "error_description":"..."}`. Only the structured code is consulted —
/// never the human-readable message.
fn classify_rejection(status: u16, body: &str) -> Error {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let description = parsed
        .as_ref()
        .and_then(|v| v.get("error_description"))
        .and_then(|v| v.as_str())
        .unwrap_or(body)
        .to_owned();

    if code == "invalid_grant" {
        Error::InvalidGrant(description)
    } else {
        Error::GrantRejected(format!("token endpoint returned {status}: {description}"))
    }
}
