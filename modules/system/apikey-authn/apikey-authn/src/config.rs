//! Configuration for API key authentication.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEME: &str = "x-api-key";
pub const DEFAULT_PURPOSE: &str = "x-api-key";
pub const DEFAULT_HEADER_NAME: &str = "x-api-key";

fn default_failure_ttl() -> Duration {
    Duration::from_secs(10)
}

/// Where the authenticator looks for the API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    /// A dedicated header, named by `header_name`.
    #[default]
    Header,
    /// `Authorization: Bearer <token>` (scheme matched case-insensitively).
    Bearer,
}

/// Authenticator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiKeyAuthConfig {
    /// Authentication scheme name stamped on accepted principals and
    /// advertised in `WWW-Authenticate`.
    pub scheme: String,

    /// Isolates tokens between unrelated uses of the same master secret.
    ///
    /// Must match the purpose the tokens were generated with.
    pub purpose: String,

    /// Extraction strategy.
    pub token_source: TokenSource,

    /// Header read when `token_source` is `header`.
    pub header_name: String,

    /// How long an accepted decision is reused. Caching is disabled when unset.
    #[serde(with = "humantime_serde")]
    pub success_ttl: Option<Duration>,

    /// How long a rejected decision is reused (never longer than `success_ttl`).
    #[serde(with = "humantime_serde")]
    pub failure_ttl: Duration,
}

impl Default for ApiKeyAuthConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_owned(),
            purpose: DEFAULT_PURPOSE.to_owned(),
            token_source: TokenSource::Header,
            header_name: DEFAULT_HEADER_NAME.to_owned(),
            success_ttl: None,
            failure_ttl: default_failure_ttl(),
        }
    }
}

impl ApiKeyAuthConfig {
    /// Check the configuration for values the authenticator cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheme or purpose is empty, the header name is
    /// not a valid HTTP header name, or a TTL is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheme.trim().is_empty() {
            anyhow::bail!("scheme must not be empty");
        }
        if self.purpose.is_empty() {
            anyhow::bail!("purpose must not be empty");
        }
        if self.token_source == TokenSource::Header {
            http::HeaderName::from_bytes(self.header_name.as_bytes())
                .map_err(|e| anyhow::anyhow!("invalid header_name '{}': {e}", self.header_name))?;
        }
        if self.success_ttl.is_some_and(|ttl| ttl.is_zero()) {
            anyhow::bail!("success_ttl must be positive; omit it to disable caching");
        }
        if self.failure_ttl.is_zero() {
            anyhow::bail!("failure_ttl must be positive");
        }
        Ok(())
    }
}

/// Token generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiKeyGeneratorConfig {
    /// Purpose new tokens are sealed under.
    pub purpose: String,
}

impl Default for ApiKeyGeneratorConfig {
    fn default() -> Self {
        Self {
            purpose: DEFAULT_PURPOSE.to_owned(),
        }
    }
}
