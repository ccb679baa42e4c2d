//! Token adapter over a purpose-scoped [`DataProtector`].
//!
//! Tokens are the standard base64 encoding of whatever the protector emits;
//! the envelope itself is opaque here.

use std::sync::Arc;
use std::time::Duration;

use apikey_authn_sdk::{DataProtectionProvider, DataProtector, ProtectorError, Unprotected};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};

/// Seals payloads into opaque string tokens and opens them again, for one purpose.
#[derive(Clone)]
pub struct KeyProtector {
    purpose: Arc<str>,
    inner: Arc<dyn DataProtector>,
}

impl KeyProtector {
    #[must_use]
    pub fn new(provider: &dyn DataProtectionProvider, purpose: &str) -> Self {
        Self {
            purpose: Arc::from(purpose),
            inner: provider.create_protector(purpose),
        }
    }

    #[must_use]
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Seal `payload` with the protector's default lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectorError::Encryption`] if sealing fails.
    pub fn seal(&self, payload: &[u8]) -> Result<String, ProtectorError> {
        self.encode(payload, None)
    }

    /// Seal `payload` so that it stops opening after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectorError::Encryption`] if `ttl` is out of range or
    /// sealing fails.
    pub fn seal_for(&self, payload: &[u8], ttl: Duration) -> Result<String, ProtectorError> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                ProtectorError::Encryption(format!("ttl of {}s out of range", ttl.as_secs()))
            })?;
        self.encode(payload, Some(expires_at))
    }

    /// Seal `payload` so that it stops opening at `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtectorError::Encryption`] if sealing fails.
    pub fn seal_until(
        &self,
        payload: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<String, ProtectorError> {
        self.encode(payload, Some(expires_at))
    }

    /// Decode and open a token.
    ///
    /// # Errors
    ///
    /// - `Malformed` if the token is not valid base64 or the envelope is unreadable
    /// - `Tampered` if it fails authentication, including a purpose mismatch
    /// - `Expired` if its embedded expiry has passed
    pub fn open(&self, token: &str) -> Result<Unprotected, ProtectorError> {
        let protected = STANDARD
            .decode(token.trim())
            .map_err(|_| ProtectorError::Malformed)?;
        self.inner.unprotect(&protected)
    }

    fn encode(
        &self,
        payload: &[u8],
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String, ProtectorError> {
        let protected = self.inner.protect(payload, expires_at)?;
        Ok(STANDARD.encode(protected))
    }
}

impl std::fmt::Debug for KeyProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProtector")
            .field("purpose", &self.purpose)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use aead_protector_plugin::AeadProtectionProvider;
    use chrono::TimeDelta;

    use super::*;

    fn provider() -> AeadProtectionProvider {
        AeadProtectionProvider::new([7u8; 32])
    }

    #[test]
    fn seal_and_open_round_trip() {
        let protector = KeyProtector::new(&provider(), "x-api-key");

        let token = protector.seal_for(b"123", Duration::from_secs(60)).unwrap();
        let opened = protector.open(&token).unwrap();

        assert_eq!(opened.payload, b"123");
        assert!(opened.expires_at.is_some());
        assert_eq!(protector.purpose(), "x-api-key");
    }

    #[test]
    fn seal_without_ttl_uses_provider_default() {
        let protector = KeyProtector::new(&provider(), "x-api-key");

        let token = protector.seal(b"123").unwrap();

        assert!(protector.open(&token).unwrap().expires_at.is_none());
    }

    #[test]
    fn token_is_standard_base64() {
        let protector = KeyProtector::new(&provider(), "x-api-key");

        let token = protector.seal(b"123").unwrap();

        assert!(STANDARD.decode(&token).is_ok());
    }

    #[test]
    fn open_rejects_non_base64() {
        let protector = KeyProtector::new(&provider(), "x-api-key");

        assert_eq!(
            protector.open("not base64 at all!").unwrap_err(),
            ProtectorError::Malformed
        );
        assert_eq!(protector.open("").unwrap_err(), ProtectorError::Malformed);
    }

    #[test]
    fn open_rejects_expired_token() {
        let protector = KeyProtector::new(&provider(), "x-api-key");

        let token = protector
            .seal_until(b"123", Utc::now() - TimeDelta::seconds(1))
            .unwrap();

        assert_eq!(protector.open(&token).unwrap_err(), ProtectorError::Expired);
    }

    #[test]
    fn open_rejects_other_purpose() {
        let provider = provider();
        let a = KeyProtector::new(&provider, "A");
        let b = KeyProtector::new(&provider, "B");

        let token = a.seal(b"123").unwrap();

        assert!(b.open(&token).is_err());
    }

    #[test]
    fn seal_for_rejects_out_of_range_ttl() {
        let protector = KeyProtector::new(&provider(), "x-api-key");

        let result = protector.seal_for(b"123", Duration::MAX);

        assert!(matches!(result, Err(ProtectorError::Encryption(_))));
    }
}
