//! Live OAuth provider and HTTP transport
//!
//! The reqwest-backed implementations of the core's collaborator traits,
//! built per session from the submitted credentials and the configured
//! redirect URI.

use std::sync::Arc;

use roadmap_auth::Credentials;
use roadmap_core::{
    BoxFuture, HttpMethod, OAuthProvider, Transport, TransportError, TransportRequest,
    TransportResponse,
};
use tracing::debug;

/// OAuth provider for one session against one DMPRoadmap host.
pub struct RoadmapProvider {
    client: reqwest::Client,
    credentials: Arc<Credentials>,
    redirect_uri: String,
}

impl RoadmapProvider {
    pub fn new(
        client: reqwest::Client,
        credentials: Arc<Credentials>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            redirect_uri: redirect_uri.into(),
        }
    }
}

impl OAuthProvider for RoadmapProvider {
    fn client_credentials_token<'a>(
        &'a self,
        scope: &'a str,
    ) -> BoxFuture<'a, roadmap_auth::Result<roadmap_auth::AccessToken>> {
        Box::pin(async move {
            roadmap_auth::client_credentials_token(&self.client, &self.credentials, scope).await
        })
    }

    fn build_authorization_url(&self, scope: &str) -> String {
        let state = roadmap_auth::generate_state();
        roadmap_auth::build_authorization_url(&self.credentials, &self.redirect_uri, scope, &state)
    }

    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
    ) -> BoxFuture<'a, roadmap_auth::Result<roadmap_auth::AccessToken>> {
        Box::pin(async move {
            roadmap_auth::exchange_code(&self.client, &self.credentials, code, &self.redirect_uri)
                .await
        })
    }
}

/// reqwest-backed transport for the test requests themselves.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            debug!(method = request.method.as_str(), url = request.url, "sending request");
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError(e.to_string()))?;
            Ok(TransportResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Form;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provider(host: &str) -> RoadmapProvider {
        RoadmapProvider::new(
            reqwest::Client::new(),
            Arc::new(Credentials::new(host, "client-123", "shh")),
            "http://localhost:4567/oauth2/callback",
        )
    }

    #[tokio::test]
    async fn transport_round_trips_status_and_body() {
        let app = Router::new().route(
            "/api/v2/templates",
            get(|headers: HeaderMap| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer tok"
                );
                (StatusCode::OK, r#"{"items":[]}"#)
            }),
        );
        let host = serve(app).await;

        let transport = ReqwestTransport::new(reqwest::Client::new());
        let response = transport
            .send(TransportRequest {
                method: HttpMethod::Get,
                url: format!("{host}/api/v2/templates"),
                headers: vec![("Authorization".into(), "Bearer tok".into())],
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"items":[]}"#);
    }

    #[tokio::test]
    async fn transport_surfaces_connection_failures() {
        let transport = ReqwestTransport::new(reqwest::Client::new());
        let err = transport
            .send(TransportRequest {
                method: HttpMethod::Get,
                url: "http://127.0.0.1:1/unreachable".into(),
                headers: vec![],
                body: None,
            })
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn client_credentials_grant_posts_the_doorkeeper_form() {
        let app = Router::new().route(
            "/oauth/token",
            post(|Form(params): Form<HashMap<String, String>>| async move {
                assert_eq!(params["grant_type"], "client_credentials");
                assert_eq!(params["client_id"], "client-123");
                assert_eq!(params["client_secret"], "shh");
                assert_eq!(params["scope"], "public read_dmps edit_dmps");
                (
                    StatusCode::OK,
                    r#"{"access_token":"at_live","token_type":"Bearer","expires_in":7200,"scope":"public read_dmps edit_dmps"}"#,
                )
            }),
        );
        let host = serve(app).await;

        let token = provider(&host)
            .client_credentials_token("public read_dmps edit_dmps")
            .await
            .unwrap();
        assert_eq!(token.value, "at_live");
        assert_eq!(token.authorization_header(), "Bearer at_live");
    }

    #[tokio::test]
    async fn exchange_classifies_invalid_grant_from_the_error_code() {
        let app = Router::new().route(
            "/oauth/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    r#"{"error":"invalid_grant","error_description":"authorization code expired"}"#,
                )
            }),
        );
        let host = serve(app).await;

        let err = provider(&host).exchange_code("dead-code").await.unwrap_err();
        assert!(err.is_invalid_grant());
    }

    #[test]
    fn authorization_url_carries_a_fresh_state() {
        let provider = provider("https://dmp.example.org");
        let a = provider.build_authorization_url("public read_dmps edit_dmps");
        let b = provider.build_authorization_url("public read_dmps edit_dmps");

        assert!(a.starts_with("https://dmp.example.org/oauth/authorize?"));
        assert!(a.contains("redirect_uri=http%3A%2F%2Flocalhost%3A4567%2Foauth2%2Fcallback"));
        assert_ne!(a, b, "each consent URL must carry a fresh state value");
    }
}
