//! Token lifecycle state machine
//!
//! Tracks the two per-session tokens and decides, per request, whether to
//! reuse a cached token, mint a new one, or suspend into a consent
//! redirect. The user-authorization side walks
//! `NoToken -> AwaitingCode -> Exchanging -> Authorized`, with
//! `Exchanging -> AwaitingCode` on an expired grant and
//! `Authorized -> NoToken` on invalidation; the states live in the session
//! store (token present / code present / pending test recorded), not in
//! process memory, so they survive the redirect round trip.

use std::sync::Arc;

use roadmap_auth::{AccessToken, token::unix_now};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::provider::OAuthProvider;
use crate::store::{TokenStore, TokenStoreExt, keys};

/// Outcome of a user-token request: either a usable token or the consent
/// URL the browser must be sent to. Returning the URL as a value (rather
/// than unwinding) lets callers pattern-match and suspend the operation.
#[derive(Debug)]
pub enum TokenOutcome {
    Token(AccessToken),
    RedirectRequired(String),
}

/// Owns reuse/refresh/redirect decisions for both token levels.
pub struct AuthorizationManager {
    provider: Arc<dyn OAuthProvider>,
    store: Arc<dyn TokenStore>,
    scope: String,
}

impl AuthorizationManager {
    pub fn new(
        provider: Arc<dyn OAuthProvider>,
        store: Arc<dyn TokenStore>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            scope: scope.into(),
        }
    }

    /// Token for the ApiClient itself. Client-credentials failures are not
    /// recoverable via redirect, so any provider error is terminal.
    pub async fn client_token(&self) -> Result<AccessToken> {
        if let Some(cached) = self.cached_token(keys::CLIENT_TOKEN) {
            debug!("reusing cached client token");
            return Ok(cached);
        }

        info!("requesting client-credentials token");
        let token = self
            .provider
            .client_credentials_token(&self.scope)
            .await
            .map_err(|e| Error::ProviderAuth(e.to_string()))?;
        self.persist_token(keys::CLIENT_TOKEN, &token);
        Ok(token)
    }

    /// Token for the end user's delegated authorization.
    ///
    /// Reuses the cached token when present; otherwise either suspends
    /// into a consent redirect (no code on hand) or exchanges the code the
    /// callback handler stored. An expired grant during exchange drops the
    /// stale state and re-enters the redirect path instead of failing.
    pub async fn user_token(&self, pending_test_id: &str) -> Result<TokenOutcome> {
        if let Some(cached) = self.cached_token(keys::USER_TOKEN) {
            debug!("reusing cached user token");
            return Ok(TokenOutcome::Token(cached));
        }

        let Some(code) = self.store.get_str(keys::AUTH_CODE) else {
            info!(
                pending_test = pending_test_id,
                "no authorization code on hand, consent redirect required"
            );
            return Ok(self.request_consent(pending_test_id));
        };

        // The code is single-use: discard it before the exchange so it can
        // never be replayed on the next refresh decision.
        self.store.delete(keys::AUTH_CODE);

        match self.provider.exchange_code(&code).await {
            Ok(token) => {
                info!("authorization code exchanged for user token");
                self.persist_token(keys::USER_TOKEN, &token);
                Ok(TokenOutcome::Token(token))
            }
            Err(e) if e.is_invalid_grant() => {
                warn!(error = %e, "grant expired during exchange, requesting fresh consent");
                self.invalidate_user_token();
                Ok(self.request_consent(pending_test_id))
            }
            Err(e) => Err(Error::ProviderAuth(e.to_string())),
        }
    }

    /// Record the authorization code delivered by the provider callback.
    ///
    /// Clears any stale cached user token (it belongs to the previous
    /// grant) and returns the operation id recorded before the redirect,
    /// if any. The pending marker itself is cleared by the resumption
    /// side, exactly once.
    pub fn handle_callback(&self, code: &str) -> Option<String> {
        debug!("authorization code received from provider callback");
        self.store.set_str(keys::AUTH_CODE, code);
        self.store.delete(keys::USER_TOKEN);
        self.store.get_str(keys::PENDING_TEST)
    }

    /// Drop the cached user token, forcing the next `user_token` call back
    /// into the redirect-or-exchange path.
    pub fn invalidate_user_token(&self) {
        self.store.delete(keys::USER_TOKEN);
    }

    /// Persist the pending-operation marker ahead of a consent redirect.
    pub fn record_pending(&self, pending_test_id: &str) {
        self.store.set_str(keys::PENDING_TEST, pending_test_id);
    }

    /// Remove the pending-operation marker at resumption.
    pub fn clear_pending(&self) {
        self.store.delete(keys::PENDING_TEST);
    }

    fn request_consent(&self, pending_test_id: &str) -> TokenOutcome {
        self.record_pending(pending_test_id);
        TokenOutcome::RedirectRequired(self.provider.build_authorization_url(&self.scope))
    }

    /// Deserialize a cached token, dropping it if unreadable or past its
    /// recorded expiry.
    fn cached_token(&self, key: &str) -> Option<AccessToken> {
        let value = self.store.get(key)?;
        match serde_json::from_value::<AccessToken>(value) {
            Ok(token) if token.is_expired(unix_now()) => {
                debug!(key, "cached token expired, discarding");
                self.store.delete(key);
                None
            }
            Ok(token) => Some(token),
            Err(e) => {
                warn!(key, error = %e, "cached token unreadable, discarding");
                self.store.delete(key);
                None
            }
        }
    }

    fn persist_token(&self, key: &str, token: &AccessToken) {
        match serde_json::to_value(token) {
            Ok(value) => self.store.set(key, value),
            Err(e) => warn!(key, error = %e, "failed to serialize token for caching"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::store::MemoryTokenStore;
    use crate::testutil::{MOCK_REDIRECT_URI, MockProvider, token};

    fn manager() -> (Arc<MockProvider>, Arc<MemoryTokenStore>, AuthorizationManager) {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(MemoryTokenStore::new());
        let manager = AuthorizationManager::new(
            provider.clone(),
            store.clone(),
            "public read_dmps edit_dmps",
        );
        (provider, store, manager)
    }

    #[tokio::test]
    async fn client_token_is_minted_once_and_reused() {
        let (provider, _store, manager) = manager();

        let first = manager.client_token().await.unwrap();
        let second = manager.client_token().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            provider.client_calls.load(Ordering::SeqCst),
            1,
            "second call must reuse the cached token"
        );
    }

    #[tokio::test]
    async fn client_token_provider_error_is_terminal() {
        let (provider, store, manager) = manager();
        provider.queue_client(Err(roadmap_auth::Error::GrantRejected(
            "invalid_client".into(),
        )));

        let err = manager.client_token().await.unwrap_err();
        assert!(matches!(err, Error::ProviderAuth(_)));
        assert!(
            store.get(keys::CLIENT_TOKEN).is_none(),
            "no token may be cached after a rejected grant"
        );
    }

    #[tokio::test]
    async fn user_token_without_code_redirects_and_records_pending_once() {
        let (provider, store, manager) = manager();

        let outcome = manager.user_token("user_plans").await.unwrap();
        let TokenOutcome::RedirectRequired(url) = outcome else {
            panic!("expected a redirect, got {outcome:?}");
        };
        assert!(url.contains(MOCK_REDIRECT_URI));
        assert!(url.contains("scope=public read_dmps edit_dmps"));
        assert_eq!(
            store.get_str(keys::PENDING_TEST).as_deref(),
            Some("user_plans")
        );

        // Calling again before the callback must not duplicate the record
        // or touch the provider.
        let again = manager.user_token("user_plans").await.unwrap();
        assert!(matches!(again, TokenOutcome::RedirectRequired(_)));
        assert_eq!(
            store.get_str(keys::PENDING_TEST).as_deref(),
            Some("user_plans")
        );
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callback_then_exchange_then_reuse_without_redirect() {
        let (provider, store, manager) = manager();

        // Redirect phase records the pending operation.
        manager.user_token("user_plan").await.unwrap();

        // Provider calls back with a code.
        let pending = manager.handle_callback("abc123");
        assert_eq!(pending.as_deref(), Some("user_plan"));

        // Exchange mints the token and consumes the code.
        let outcome = manager.user_token("user_plan").await.unwrap();
        let TokenOutcome::Token(minted) = outcome else {
            panic!("expected a token after callback");
        };
        assert_eq!(minted.value, "user-abc123");
        assert!(
            store.get_str(keys::AUTH_CODE).is_none(),
            "authorization code must be single-use"
        );

        // Subsequent call reuses the cached token: no exchange, no redirect.
        let reused = manager.user_token("user_plan").await.unwrap();
        assert!(matches!(reused, TokenOutcome::Token(t) if t.value == "user-abc123"));
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn callback_clears_stale_user_token() {
        let (_provider, store, manager) = manager();
        store.set(keys::USER_TOKEN, serde_json::to_value(token("old")).unwrap());

        let _ = manager.handle_callback("new-code");

        assert!(store.get(keys::USER_TOKEN).is_none());
        assert_eq!(store.get_str(keys::AUTH_CODE).as_deref(), Some("new-code"));
    }

    #[tokio::test]
    async fn expired_grant_during_exchange_re_enters_redirect_path() {
        let (provider, store, manager) = manager();
        provider.queue_exchange(Err(roadmap_auth::Error::InvalidGrant(
            "authorization code expired".into(),
        )));

        let _ = manager.user_token("user_plan_pdf").await.unwrap();
        let _ = manager.handle_callback("expired-code");

        let outcome = manager.user_token("user_plan_pdf").await.unwrap();
        assert!(
            matches!(outcome, TokenOutcome::RedirectRequired(_)),
            "an expired grant must produce a fresh consent redirect"
        );
        assert!(
            store.get(keys::USER_TOKEN).is_none(),
            "no expired token may be retained"
        );
        assert!(
            store.get_str(keys::AUTH_CODE).is_none(),
            "the dead code must not be retried"
        );
        assert_eq!(
            store.get_str(keys::PENDING_TEST).as_deref(),
            Some("user_plan_pdf"),
            "the pending operation must be re-recorded for the new redirect"
        );
    }

    #[tokio::test]
    async fn other_exchange_errors_are_terminal() {
        let (provider, _store, manager) = manager();
        provider.queue_exchange(Err(roadmap_auth::Error::GrantRejected(
            "redirect_uri mismatch".into(),
        )));

        let _ = manager.handle_callback("some-code");
        let err = manager.user_token("user_plan").await.unwrap_err();
        assert!(matches!(err, Error::ProviderAuth(_)));
    }

    #[tokio::test]
    async fn expired_cached_client_token_is_re_minted() {
        let (provider, store, manager) = manager();
        let mut stale = token("stale");
        stale.expiry = Some(1); // long past
        store.set(keys::CLIENT_TOKEN, serde_json::to_value(&stale).unwrap());

        let fresh = manager.client_token().await.unwrap();
        assert_eq!(fresh.value, "client-token");
        assert_eq!(provider.client_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreadable_cached_token_is_discarded() {
        let (_provider, store, manager) = manager();
        store.set(keys::USER_TOKEN, json!({"not": "a token"}));

        let outcome = manager.user_token("user_plans").await.unwrap();
        assert!(matches!(outcome, TokenOutcome::RedirectRequired(_)));
    }

    #[tokio::test]
    async fn invalidation_forces_the_redirect_path_again() {
        let (_provider, _store, manager) = manager();
        let _ = manager.handle_callback("abc");
        let outcome = manager.user_token("user_plans").await.unwrap();
        assert!(matches!(outcome, TokenOutcome::Token(_)));

        manager.invalidate_user_token();
        let after = manager.user_token("user_plans").await.unwrap();
        assert!(matches!(after, TokenOutcome::RedirectRequired(_)));
    }
}
