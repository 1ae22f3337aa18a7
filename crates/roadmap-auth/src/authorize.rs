//! Authorization-code consent URL
//!
//! Builds the provider URL the browser is sent to when a user-scoped test
//! needs delegated authorization. The `state` parameter is an opaque
//! random value echoed back in the callback for CSRF protection.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

use crate::credentials::Credentials;

/// Generate a random `state` value: 16 bytes, URL-safe base64, no padding.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the full consent URL with all required OAuth parameters.
pub fn build_authorization_url(
    credentials: &Credentials,
    redirect_uri: &str,
    scope: &str,
    state: &str,
) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        credentials.authorize_endpoint(),
        urlencoded(&credentials.client_id),
        urlencoded(redirect_uri),
        urlencoded(scope),
        state,
    )
}

/// Minimal URL encoding for parameter values.
/// Only encodes characters that would break URL parameter parsing.
fn urlencoded(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('&', "%26")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> Credentials {
        Credentials::new("https://dmp.example.org", "client-123", "shh")
    }

    #[test]
    fn state_values_are_url_safe_and_unique() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b, "two state values must not collide");
        // 16 bytes -> 22 base64url chars, no padding
        assert_eq!(a.len(), 22);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "state must be URL-safe base64: {a}"
        );
    }

    #[test]
    fn consent_url_contains_required_params() {
        let url = build_authorization_url(
            &test_credentials(),
            "http://localhost:4567/oauth2/callback",
            "public read_dmps edit_dmps",
            "st4te",
        );
        assert!(url.starts_with("https://dmp.example.org/oauth/authorize?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A4567%2Foauth2%2Fcallback"
        ));
        assert!(url.contains("scope=public%20read_dmps%20edit_dmps"));
        assert!(url.contains("state=st4te"));
    }

    #[test]
    fn urlencoded_escapes_percent_first() {
        assert_eq!(urlencoded("a%b c"), "a%25b%20c");
    }
}
