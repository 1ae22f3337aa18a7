//! DMPRoadmap OAuth2 collaborator
//!
//! Wraps the two grant protocols the console needs against a Doorkeeper-style
//! provider (`{host}/oauth/authorize`, `{host}/oauth/token`):
//! 1. Client-credentials grant for client-scoped API access
//! 2. Authorization-code grant for user-scoped API access (browser consent)
//!
//! This crate is a standalone library with no dependency on the console
//! binary or the core state machine — it only knows how to mint and parse
//! tokens. `Error::InvalidGrant` is derived from the structured `error`
//! code in the provider's JSON error body, so callers can distinguish an
//! expired grant (recoverable via re-authorization) from any other
//! rejection.

pub mod authorize;
pub mod credentials;
pub mod error;
pub mod token;

pub use authorize::{build_authorization_url, generate_state};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use token::{AccessToken, TokenResponse, client_credentials_token, exchange_code};

/// Scope set requested for every token, matching what the target API
/// grants a registered ApiClient.
pub const DEFAULT_SCOPE: &str = "public read_dmps edit_dmps";
