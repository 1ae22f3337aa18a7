//! Error types for OAuth grant operations

/// Errors from OAuth grant operations.
///
/// `InvalidGrant` is the one recoverable variant: the authorization code or
/// underlying grant has expired and the caller should re-initiate consent.
/// Everything else is terminal for the current operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("grant expired or revoked: {0}")]
    InvalidGrant(String),

    #[error("provider rejected the grant: {0}")]
    GrantRejected(String),

    #[error("invalid token response: {0}")]
    TokenParse(String),
}

/// Result alias for grant operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error means the grant expired and consent should be
    /// requested again.
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Error::InvalidGrant(_))
    }
}
