//! Cookie-backed session registry
//!
//! Each browser session gets a random id in the `console_session` cookie
//! and an in-memory `TokenStore` of its own, so the token state survives
//! the consent redirect round trip and never leaks between sessions. The
//! submitted credentials live in the same store under a service-local key.
//! Single-writer per session is assumed, not enforced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

use roadmap_auth::Credentials;
use roadmap_core::{MemoryTokenStore, TokenStore};

pub const SESSION_COOKIE: &str = "console_session";

/// Store key for the session's submitted credentials.
const CREDENTIALS_KEY: &str = "credentials";

/// Maps session ids to their token stores.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<MemoryTokenStore>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the store for a session id.
    pub fn store(&self, id: &str) -> Arc<MemoryTokenStore> {
        self.sessions
            .lock()
            .expect("session registry poisoned")
            .entry(id.to_owned())
            .or_default()
            .clone()
    }

    /// Look up an existing session without creating one.
    pub fn lookup(&self, id: &str) -> Option<Arc<MemoryTokenStore>> {
        self.sessions
            .lock()
            .expect("session registry poisoned")
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .expect("session registry poisoned")
            .len()
    }
}

/// Random 128-bit session id, URL-safe base64 without padding.
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Extract the session id from the request's `Cookie` header.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_owned())
    })
}

/// `Set-Cookie` value establishing the session.
pub fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

/// Persist the form-submitted credentials for the callback round trip.
pub fn save_credentials(store: &dyn TokenStore, credentials: &Credentials) {
    store.set(
        CREDENTIALS_KEY,
        serde_json::json!({
            "host": credentials.host(),
            "client_id": credentials.client_id,
            "client_secret": credentials.client_secret.expose(),
        }),
    );
}

/// Rebuild the session's credentials, if any were submitted.
pub fn load_credentials(store: &dyn TokenStore) -> Option<Credentials> {
    let value = store.get(CREDENTIALS_KEY)?;
    Some(Credentials::new(
        value.get("host")?.as_str()?,
        value.get("client_id")?.as_str()?,
        value.get("client_secret")?.as_str()?,
    ))
}
