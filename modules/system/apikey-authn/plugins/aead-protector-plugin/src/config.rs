//! Configuration for the AEAD data protection provider.

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AeadProtectorConfig {
    /// 32-byte master secret, as 64 hex characters or base64 (standard or URL-safe).
    ///
    /// Every purpose derives its own subkey from this secret.
    pub master_key: SecretString,

    /// Lifetime of tokens sealed without an explicit expiry.
    ///
    /// When unset such tokens never expire.
    #[serde(with = "humantime_serde")]
    pub default_ttl: Option<Duration>,
}

impl Default for AeadProtectorConfig {
    fn default() -> Self {
        Self {
            master_key: SecretString::from(String::new()),
            default_ttl: None,
        }
    }
}
