//! Error types for the API key authentication module.

use thiserror::Error;

/// Failures reported by a [`DataProtector`](crate::DataProtector).
///
/// The authenticator folds every `unprotect` failure into a single
/// "invalid key" rejection; the variants exist for logging and for the
/// generator, where `Encryption` is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtectorError {
    /// The token is not valid base64 or the envelope is truncated or of an
    /// unknown version.
    #[error("malformed token")]
    Malformed,

    /// The authentication tag did not verify (tampered data or a different purpose).
    #[error("token failed integrity check")]
    Tampered,

    /// The embedded expiry has passed.
    #[error("token expired")]
    Expired,

    /// Sealing failed inside the underlying cipher.
    #[error("encryption failed: {0}")]
    Encryption(String),
}

/// Errors that can occur when issuing or validating API keys.
///
/// Rejections (missing or invalid keys) are *not* errors; they are reported as
/// [`AuthenticationOutcome::Rejected`](crate::AuthenticationOutcome::Rejected).
#[derive(Debug, Error)]
pub enum ApiKeyAuthError {
    /// The protector failed to seal a token.
    #[error("token protection failed: {0}")]
    Protection(#[from] ProtectorError),

    /// The identity key has no token form that parses back, such as an
    /// empty user id.
    #[error("invalid identity key: {0}")]
    InvalidIdentity(String),

    /// The outcome builder failed to produce a decision.
    #[error("outcome builder failed: {0}")]
    OutcomeBuilder(String),

    /// A dependency of the outcome builder is not available.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}
