//! v0 and v1 API helpers
//!
//! The two pre-OAuth authentication schemes, each a stateless round trip:
//! v0 sends a static API token (`Authorization: Token token=...`) against
//! `{host}/api/v0`; v1 first POSTs client credentials to
//! `{host}/api/v1/authenticate` and then sends the returned
//! `{token_type} {access_token}` on the test request. Responses are
//! normalized the same way the v2 runner does it: non-2xx is a result,
//! not a fault, and undecodable bodies keep the raw text.

use roadmap_auth::{Credentials, TokenResponse};
use roadmap_core::{Error, Result, TestResult};
use serde_json::Value;
use tracing::{debug, warn};

pub async fn run_v0(
    client: &reqwest::Client,
    host: &str,
    api_token: &str,
    path: &str,
) -> Result<TestResult> {
    let url = format!("{}/api/v0{path}", host.trim_end_matches('/'));
    debug!(url, "issuing v0 test request");
    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Token token={api_token}"))
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    interpret(&url, response).await
}

pub async fn run_v1(
    client: &reqwest::Client,
    credentials: &Credentials,
    path: &str,
) -> Result<TestResult> {
    let base = format!("{}/api/v1", credentials.host());
    let header = authenticate(client, credentials, &base).await?;

    let url = format!("{base}{path}");
    debug!(url, "issuing v1 test request");
    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .header("Authorization", header)
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    interpret(&url, response).await
}

/// Mint a v1 bearer header via the client-credentials authenticate call.
async fn authenticate(
    client: &reqwest::Client,
    credentials: &Credentials,
    base: &str,
) -> Result<String> {
    let payload = serde_json::json!({
        "grant_type": "client_credentials",
        "client_id": credentials.client_id,
        "client_secret": credentials.client_secret.expose(),
    });

    let response = client
        .post(format!("{base}/authenticate"))
        .header("Accept", "application/json")
        .header("Content-Type", "application/json")
        .body(payload.to_string())
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(Error::ProviderAuth(format!(
            "Unable to authenticate for v1 API - {status}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::ProviderAuth(format!("v1 authenticate returned invalid JSON: {e}")))?;
    Ok(format!("{} {}", token.token_type, token.access_token))
}

async fn interpret(url: &str, response: reqwest::Response) -> Result<TestResult> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    let mut error = if matches!(status, 200 | 201) {
        None
    } else {
        warn!(status, url, "legacy API returned a non-success status");
        Some(format!(
            "Unexpected response from the API for {url} - {status}"
        ))
    };

    Ok(match serde_json::from_str::<Value>(&body) {
        Ok(decoded) => TestResult {
            status,
            body: Some(decoded),
            raw: None,
            error,
        },
        Err(e) => {
            let parse_message = format!("Unable to parse JSON response from the API for {url}: {e}");
            error = Some(match error {
                Some(upstream) => format!("{upstream}; {parse_message}"),
                None => parse_message,
            });
            TestResult {
                status,
                body: None,
                raw: Some(body),
                error,
            }
        }
    })
}
