//! API key issuance.

use std::time::Duration;

use apikey_authn_sdk::{ApiKeyAuthError, DataProtectionProvider, IdentityKey};
use chrono::{DateTime, Utc};

use crate::config::ApiKeyGeneratorConfig;
use crate::protector::KeyProtector;

/// Issues API keys for identity keys.
///
/// The generator and the authenticator must share a protection provider and
/// purpose for issued keys to be accepted.
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    protector: KeyProtector,
}

impl ApiKeyGenerator {
    #[must_use]
    pub fn new(provider: &dyn DataProtectionProvider, cfg: &ApiKeyGeneratorConfig) -> Self {
        Self {
            protector: KeyProtector::new(provider, &cfg.purpose),
        }
    }

    #[must_use]
    pub fn purpose(&self) -> &str {
        self.protector.purpose()
    }

    /// Issue a key with the protector's default lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ApiKeyAuthError::InvalidIdentity`] if `key` encodes to an
    /// empty payload, or [`ApiKeyAuthError::Protection`] if the protector
    /// fails to seal.
    pub fn protect_key<K: IdentityKey>(&self, key: &K) -> Result<String, ApiKeyAuthError> {
        self.issue(|payload| self.protector.seal(payload), key)
    }

    /// Issue a key valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`ApiKeyAuthError::InvalidIdentity`] if `key` encodes to an
    /// empty payload, or [`ApiKeyAuthError::Protection`] if the protector
    /// fails to seal.
    pub fn protect_key_for<K: IdentityKey>(
        &self,
        key: &K,
        ttl: Duration,
    ) -> Result<String, ApiKeyAuthError> {
        self.issue(|payload| self.protector.seal_for(payload, ttl), key)
    }

    /// Issue a key valid until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiKeyAuthError::InvalidIdentity`] if `key` encodes to an
    /// empty payload, or [`ApiKeyAuthError::Protection`] if the protector
    /// fails to seal.
    pub fn protect_key_until<K: IdentityKey>(
        &self,
        key: &K,
        expires_at: DateTime<Utc>,
    ) -> Result<String, ApiKeyAuthError> {
        self.issue(|payload| self.protector.seal_until(payload, expires_at), key)
    }

    fn issue<K, F>(&self, seal: F, key: &K) -> Result<String, ApiKeyAuthError>
    where
        K: IdentityKey,
        F: FnOnce(&[u8]) -> Result<String, apikey_authn_sdk::ProtectorError>,
    {
        let payload = key.to_token_bytes();
        if payload.is_empty() {
            tracing::warn!(purpose = self.purpose(), "refusing to protect empty api key payload");
            return Err(ApiKeyAuthError::InvalidIdentity("empty payload".to_owned()));
        }
        seal(&payload).map_err(|e| {
            tracing::error!(purpose = self.purpose(), error = %e, "failed to protect api key");
            ApiKeyAuthError::Protection(e)
        })
    }
}
