//! API client credentials and provider endpoint derivation
//!
//! The console is a confidential OAuth client: the user supplies the target
//! host plus a client id/secret pair once per browser session. Endpoints
//! are derived from the host rather than configured separately because the
//! target API mounts Doorkeeper at the conventional `/oauth/*` paths.

use common::Secret;

/// Credentials for one session against one target host.
///
/// Immutable for the lifetime of the session. The secret is wrapped so a
/// stray `{:?}` on a request context can never log it.
#[derive(Debug, Clone)]
pub struct Credentials {
    host: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl Credentials {
    /// Build credentials from form input. The host is normalized by
    /// trimming any trailing slash so endpoint derivation never produces
    /// `//oauth/token`.
    pub fn new(host: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_owned(),
            client_id: client_id.to_owned(),
            client_secret: Secret::new(client_secret.to_owned()),
        }
    }

    /// Base URL of the target instance, no trailing slash.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Token endpoint for both grant types.
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.host)
    }

    /// Consent page the end user is redirected to for the
    /// authorization-code grant.
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth/authorize", self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let creds = Credentials::new("https://dmp.example.org/", "abc", "shh");
        assert_eq!(creds.host(), "https://dmp.example.org");
        assert_eq!(
            creds.token_endpoint(),
            "https://dmp.example.org/oauth/token"
        );
        assert_eq!(
            creds.authorize_endpoint(),
            "https://dmp.example.org/oauth/authorize"
        );
    }

    #[test]
    fn debug_never_exposes_the_secret() {
        let creds = Credentials::new("https://dmp.example.org", "abc", "super-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("super-secret"), "leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
