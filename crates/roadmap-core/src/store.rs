//! Session-scoped token store
//!
//! The store is an opaque key-value surface the core reads and writes;
//! the service owns one instance per browser session and keeps it alive
//! across requests so state survives the redirect/callback round trip.
//! Single-writer per session is assumed, not enforced.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

/// Well-known store keys. Everything the authorization state machine
/// persists lives under one of these.
pub mod keys {
    /// Serialized ClientToken (client-credentials grant).
    pub const CLIENT_TOKEN: &str = "client_token";
    /// Serialized UserToken (authorization-code grant).
    pub const USER_TOKEN: &str = "user_token";
    /// Single-use authorization code set by the callback handler.
    pub const AUTH_CODE: &str = "auth_code";
    /// Operation id awaiting the provider callback.
    pub const PENDING_TEST: &str = "pending_test";
    /// Last upstream error message, for the UI to display.
    pub const LAST_ERROR: &str = "last_error";
}

/// Opaque persisted key-value state surviving across requests.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn delete(&self, key: &str);
}

/// Typed convenience accessors over any store implementation.
pub trait TokenStoreExt: TokenStore {
    fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|v| v.as_str().map(str::to_owned))
            .filter(|s| !s.is_empty())
    }

    fn set_str(&self, key: &str, value: &str) {
        self.set(key, Value::String(value.to_owned()));
    }
}

impl<T: TokenStore + ?Sized> TokenStoreExt for T {}

/// In-memory store backing one session. The mutex covers single map
/// operations only; the session-level single-writer assumption does the
/// rest.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().expect("store poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries
            .lock()
            .expect("store poisoned")
            .insert(key.to_owned(), value);
    }

    fn delete(&self, key: &str) {
        self.entries.lock().expect("store poisoned").remove(key);
    }
}
