//! Collaborator traits for purpose-scoped, time-limited encryption.
//!
//! The authenticator does not implement a cipher. A plugin supplies a
//! [`DataProtectionProvider`]; the module asks it for one [`DataProtector`]
//! per purpose and wraps that in its own base64 token adapter.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::ProtectorError;

/// Plaintext recovered from a protected payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unprotected {
    /// The original plaintext.
    pub payload: Vec<u8>,
    /// Expiry that was sealed into the payload; `None` if it never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Authenticated encryption bound to a single purpose.
///
/// Implementations must:
/// - fail `unprotect` for anything sealed under a different purpose,
/// - fail `unprotect` for any modified, truncated or expired payload,
/// - be safe to call concurrently.
pub trait DataProtector: Send + Sync {
    /// Seal `plaintext` until `expires_at`, or until the provider's default
    /// lifetime when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectorError::Encryption`] if the cipher fails.
    fn protect(
        &self,
        plaintext: &[u8],
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>, ProtectorError>;

    /// Verify and open a payload produced by [`protect`](Self::protect).
    ///
    /// # Errors
    ///
    /// - `Malformed` if the envelope cannot be parsed
    /// - `Tampered` if the integrity check fails (including a purpose mismatch)
    /// - `Expired` if the embedded expiry has passed
    fn unprotect(&self, protected: &[u8]) -> Result<Unprotected, ProtectorError>;
}

/// Source of purpose-scoped protectors sharing one master secret.
pub trait DataProtectionProvider: Send + Sync {
    /// Create a protector whose payloads only open under the same `purpose`.
    fn create_protector(&self, purpose: &str) -> Arc<dyn DataProtector>;
}
