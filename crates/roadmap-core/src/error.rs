//! Core error taxonomy
//!
//! Everything here is a structured value handed back to the UI layer.
//! Upstream non-2xx statuses and JSON decode failures are deliberately NOT
//! errors at this level — they travel inside `TestResult` so the console
//! can render the response the API actually sent.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing host/credentials detected before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The OAuth provider rejected a grant for a reason other than expiry.
    #[error("provider authorization failed: {0}")]
    ProviderAuth(String),

    /// A chained request could not derive a resource id from the list
    /// response. Terminal for the operation.
    #[error("could not resolve a resource identifier: {0}")]
    IdentifierResolution(String),

    /// The submitted operation id is not in the catalog.
    #[error("unknown test operation: {0}")]
    UnknownOperation(String),

    /// A provider callback arrived with no pending operation recorded.
    #[error("no pending operation to resume")]
    NoPendingOperation,

    /// Transport-level failure (connection refused, timeout). Generic.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Result alias using core Error
pub type Result<T> = std::result::Result<T, Error>;
