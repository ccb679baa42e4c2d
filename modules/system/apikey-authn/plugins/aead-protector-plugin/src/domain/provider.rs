//! Data protection provider deriving one subkey per purpose.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use apikey_authn_sdk::{DataProtectionProvider, DataProtector};
use hkdf::Hkdf;
use rand::RngCore;
use secrecy::ExposeSecret;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::key_material::{MASTER_KEY_LEN, parse_master_key};
use super::protector::AeadDataProtector;
use crate::config::AeadProtectorConfig;

const HKDF_SALT: &[u8] = b"cf-apikey-authn/aead-protector/v1";

/// `ChaCha20-Poly1305` [`DataProtectionProvider`].
///
/// Each purpose gets an independent key, HKDF-SHA256(master key, info = purpose),
/// so one master secret can back several unrelated token families.
pub struct AeadProtectionProvider {
    master_key: Zeroizing<[u8; MASTER_KEY_LEN]>,
    default_ttl: Option<Duration>,
}

impl AeadProtectionProvider {
    #[must_use]
    pub fn new(master_key: [u8; MASTER_KEY_LEN]) -> Self {
        Self {
            master_key: Zeroizing::new(master_key),
            default_ttl: None,
        }
    }

    /// Provider with a freshly generated random master key.
    ///
    /// Tokens do not survive a restart; meant for development and tests.
    #[must_use]
    pub fn ephemeral() -> Self {
        let mut master_key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        rand::rng().fill_bytes(master_key.as_mut_slice());
        Self {
            master_key,
            default_ttl: None,
        }
    }

    /// Build the provider from plugin configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured master key cannot be decoded.
    pub fn from_config(cfg: &AeadProtectorConfig) -> anyhow::Result<Self> {
        let master_key = parse_master_key(cfg.master_key.expose_secret())?;
        Ok(Self {
            master_key,
            default_ttl: cfg.default_ttl,
        })
    }

    /// Lifetime applied when a token is sealed without an explicit expiry.
    #[must_use]
    pub fn with_default_ttl(mut self, default_ttl: Option<Duration>) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    #[must_use]
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    #[allow(clippy::expect_used)] // 32 bytes is within the HKDF-SHA256 output limit
    fn derive_subkey(&self, purpose: &str) -> Zeroizing<[u8; 32]> {
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), self.master_key.as_slice());
        let mut subkey = Zeroizing::new([0u8; 32]);
        hk.expand(purpose.as_bytes(), subkey.as_mut_slice())
            .expect("valid HKDF output length");
        subkey
    }
}

impl DataProtectionProvider for AeadProtectionProvider {
    fn create_protector(&self, purpose: &str) -> Arc<dyn DataProtector> {
        let subkey = self.derive_subkey(purpose);
        tracing::debug!(purpose, "created data protector");
        Arc::new(AeadDataProtector::new(&subkey, purpose, self.default_ttl))
    }
}

impl fmt::Debug for AeadProtectionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadProtectionProvider")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn subkeys_differ_per_purpose() {
        let provider = AeadProtectionProvider::new([9u8; 32]);

        let a = provider.derive_subkey("x-api-key");
        let b = provider.derive_subkey("webhooks");

        assert_ne!(*a, *b);
        assert_eq!(*a, *provider.derive_subkey("x-api-key"));
    }

    #[test]
    fn subkeys_differ_per_master_key() {
        let a = AeadProtectionProvider::new([1u8; 32]).derive_subkey("x-api-key");
        let b = AeadProtectionProvider::new([2u8; 32]).derive_subkey("x-api-key");

        assert_ne!(*a, *b);
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let provider = AeadProtectionProvider::new([0xab; 32]);
        let rendered = format!("{provider:?}");

        assert!(rendered.contains("AeadProtectionProvider"));
        assert!(!rendered.contains("171"));
    }

    #[test]
    fn from_config_rejects_missing_key() {
        let result = AeadProtectionProvider::from_config(&AeadProtectorConfig::default());
        assert!(result.is_err());
    }
}
