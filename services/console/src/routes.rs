//! Request handlers
//!
//! `GET /` renders the form, `POST /test` dispatches a submitted test to
//! the v0/v1 helpers or the v2 console, and `GET /oauth2/callback` resumes
//! a suspended test with the code the provider delivered. A redirect
//! outcome from the core becomes a `302 Found` to the consent page.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, warn};

use roadmap_auth::Credentials;
use roadmap_core::{MemoryTokenStore, RunOutcome, TestConsole, TestResult, TokenStoreExt, keys};

use crate::provider_impl::{ReqwestTransport, RoadmapProvider};
use crate::session::{
    self, load_credentials, new_session_id, save_credentials, session_id_from_headers,
};
use crate::{AppState, legacy, view};

#[derive(Debug, Deserialize)]
pub struct TestForm {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub test: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    // Show the last recorded upstream error for this session, if any.
    let last_error = session_id_from_headers(&headers)
        .and_then(|id| state.sessions.lookup(&id))
        .and_then(|store| store.get_str(keys::LAST_ERROR));

    render(&state, None, None, last_error.as_deref())
}

pub async fn submit_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TestForm>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    state.tests_run.fetch_add(1, Ordering::Relaxed);

    let (store, set_cookie) = establish_session(&state, &headers);

    if form.host.is_empty() || form.test.is_empty() {
        return invalid_submission(
            &state,
            set_cookie.as_deref(),
            "You MUST provide a host and select a test!",
        );
    }

    info!(
        request_id,
        host = form.host,
        api_version = form.api_version,
        test = form.test,
        "test submitted"
    );

    match form.api_version.as_str() {
        "v0" => {
            if form.api_token.is_empty() {
                return invalid_submission(
                    &state,
                    set_cookie.as_deref(),
                    "You MUST provide an API token!",
                );
            }
            let Some(path) = legacy_path(&state, &form.test) else {
                return render(
                    &state,
                    set_cookie.as_deref(),
                    None,
                    Some("That test is only available against the v2 API"),
                );
            };
            let outcome = legacy::run_v0(&state.client, &form.host, &form.api_token, &path).await;
            render_result(&state, set_cookie.as_deref(), outcome)
        }
        "v1" => {
            if form.client_id.is_empty() || form.client_secret.is_empty() {
                return invalid_submission(
                    &state,
                    set_cookie.as_deref(),
                    "You MUST provide an API client_id and client_secret!",
                );
            }
            let Some(path) = legacy_path(&state, &form.test) else {
                return render(
                    &state,
                    set_cookie.as_deref(),
                    None,
                    Some("That test is only available against the v2 API"),
                );
            };
            let credentials = Credentials::new(&form.host, &form.client_id, &form.client_secret);
            let outcome = legacy::run_v1(&state.client, &credentials, &path).await;
            render_result(&state, set_cookie.as_deref(), outcome)
        }
        // v2 is the default scheme.
        _ => {
            if form.client_id.is_empty() || form.client_secret.is_empty() {
                return invalid_submission(
                    &state,
                    set_cookie.as_deref(),
                    "You MUST provide an API client_id and client_secret!",
                );
            }
            let credentials = Credentials::new(&form.host, &form.client_id, &form.client_secret);
            save_credentials(store.as_ref(), &credentials);

            let console = console_for(&state, store, credentials);
            match console.run(&form.test).await {
                Ok(RunOutcome::Completed(result)) => {
                    render(&state, set_cookie.as_deref(), Some(&result), None)
                }
                Ok(RunOutcome::Redirect(url)) => {
                    info!(request_id, "redirecting to provider consent page");
                    redirect(&url, set_cookie.as_deref())
                }
                Err(e) => {
                    warn!(request_id, error = %e, "test failed");
                    render(&state, set_cookie.as_deref(), None, Some(&e.to_string()))
                }
            }
        }
    }
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(provider_error) = query.error {
        warn!(error = provider_error, "provider denied the authorization");
        return render(
            &state,
            None,
            None,
            Some(&format!("Authorization was denied: {provider_error}")),
        );
    }
    let Some(code) = query.code else {
        return render(&state, None, None, Some("Callback arrived without a code"));
    };

    let Some(store) = session_id_from_headers(&headers).and_then(|id| state.sessions.lookup(&id))
    else {
        return render(
            &state,
            None,
            None,
            Some("No active session for this callback - submit a test first"),
        );
    };
    let Some(credentials) = load_credentials(store.as_ref()) else {
        return render(
            &state,
            None,
            None,
            Some("No credentials on file for this session - submit a test first"),
        );
    };

    let console = console_for(&state, store, credentials);
    match console.resume_from_callback(&code).await {
        Ok(RunOutcome::Completed(result)) => render(&state, None, Some(&result), None),
        // The grant expired between consent and exchange; ask again.
        Ok(RunOutcome::Redirect(url)) => redirect(&url, None),
        Err(e) => {
            warn!(error = %e, "callback resumption failed");
            render(&state, None, None, Some(&e.to_string()))
        }
    }
}

/// Resolve the session from the cookie, creating one (and its Set-Cookie)
/// when the browser has none yet.
fn establish_session(
    state: &AppState,
    headers: &HeaderMap,
) -> (Arc<MemoryTokenStore>, Option<String>) {
    match session_id_from_headers(headers) {
        Some(id) => (state.sessions.store(&id), None),
        None => {
            let id = new_session_id();
            let store = state.sessions.store(&id);
            (store, Some(session::session_cookie(&id)))
        }
    }
}

fn console_for(
    state: &AppState,
    store: Arc<MemoryTokenStore>,
    credentials: Credentials,
) -> TestConsole {
    let credentials = Arc::new(credentials);
    let api_base = format!("{}/api/v2", credentials.host());
    let provider = Arc::new(RoadmapProvider::new(
        state.client.clone(),
        credentials,
        state.redirect_uri.clone(),
    ));
    let transport = Arc::new(ReqwestTransport::new(state.client.clone()));
    TestConsole::new(
        state.catalog.clone(),
        store,
        provider,
        transport,
        api_base,
        roadmap_auth::DEFAULT_SCOPE,
    )
}

/// v0/v1 support only the plain list tests; placeholder paths need the v2
/// resolution machinery.
fn legacy_path(state: &AppState, test: &str) -> Option<String> {
    let operation = state.catalog.get(test)?;
    (!operation.path_template.contains("{id}")).then(|| operation.path_template.clone())
}

/// Rejected before any network call.
fn invalid_submission(state: &AppState, set_cookie: Option<&str>, message: &str) -> Response {
    let error = roadmap_core::Error::Configuration(message.to_owned());
    render(state, set_cookie, None, Some(&error.to_string()))
}

fn render(
    state: &AppState,
    set_cookie: Option<&str>,
    result: Option<&TestResult>,
    error: Option<&str>,
) -> Response {
    let mut response = Html(view::page(&state.catalog, result, error)).into_response();
    attach_cookie(&mut response, set_cookie);
    response
}

fn render_result(
    state: &AppState,
    set_cookie: Option<&str>,
    outcome: roadmap_core::Result<TestResult>,
) -> Response {
    match outcome {
        Ok(result) => render(state, set_cookie, Some(&result), None),
        Err(e) => render(state, set_cookie, None, Some(&e.to_string())),
    }
}

fn redirect(url: &str, set_cookie: Option<&str>) -> Response {
    let mut response = (StatusCode::FOUND, [(header::LOCATION, url.to_owned())]).into_response();
    attach_cookie(&mut response, set_cookie);
    response
}

fn attach_cookie(response: &mut Response, set_cookie: Option<&str>) {
    if let Some(cookie) = set_cookie
        && let Ok(value) = header::HeaderValue::from_str(cookie)
    {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
}
