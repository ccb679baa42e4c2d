//! Authenticator options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use apikey_authn_sdk::{DefaultOutcomeBuilder, IdentityKey, OutcomeBuilder};

use crate::config::{ApiKeyAuthConfig, DEFAULT_PURPOSE, DEFAULT_SCHEME};
use crate::extract::{HeaderExtractor, TokenExtractor, extractor_from_config};

/// Runtime options of an [`ApiKeyAuthenticator`](crate::ApiKeyAuthenticator).
///
/// Built from [`ApiKeyAuthConfig`] for the serializable part, then extended
/// with code-only hooks (`with_extractor`, `with_outcome_builder`).
pub struct ApiKeyOptions<K> {
    pub scheme: String,
    pub purpose: String,
    /// Caching is disabled when `None`.
    pub success_ttl: Option<Duration>,
    pub failure_ttl: Duration,
    pub extractor: Arc<dyn TokenExtractor>,
    pub outcome_builder: Arc<dyn OutcomeBuilder<K>>,
}

impl<K: IdentityKey> Default for ApiKeyOptions<K> {
    fn default() -> Self {
        let cfg = ApiKeyAuthConfig::default();
        Self {
            scheme: DEFAULT_SCHEME.to_owned(),
            purpose: DEFAULT_PURPOSE.to_owned(),
            success_ttl: cfg.success_ttl,
            failure_ttl: cfg.failure_ttl,
            extractor: Arc::new(HeaderExtractor::default()),
            outcome_builder: Arc::new(DefaultOutcomeBuilder),
        }
    }
}

impl<K: IdentityKey> ApiKeyOptions<K> {
    /// Build options from configuration, with the default outcome builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn from_config(cfg: &ApiKeyAuthConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let extractor = extractor_from_config(cfg)?;
        Ok(Self {
            scheme: cfg.scheme.clone(),
            purpose: cfg.purpose.clone(),
            success_ttl: cfg.success_ttl,
            failure_ttl: cfg.failure_ttl,
            extractor: Arc::from(extractor),
            outcome_builder: Arc::new(DefaultOutcomeBuilder),
        })
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: impl TokenExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    #[must_use]
    pub fn with_outcome_builder(mut self, builder: impl OutcomeBuilder<K> + 'static) -> Self {
        self.outcome_builder = Arc::new(builder);
        self
    }

    #[must_use]
    pub fn with_success_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.success_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_failure_ttl(mut self, ttl: Duration) -> Self {
        self.failure_ttl = ttl;
        self
    }
}

impl<K> ApiKeyOptions<K> {
    /// Failure TTL actually applied: never longer than the success TTL.
    #[must_use]
    pub fn effective_failure_ttl(&self) -> Duration {
        self.success_ttl
            .map_or(self.failure_ttl, |success| self.failure_ttl.min(success))
    }
}

impl<K> Clone for ApiKeyOptions<K> {
    fn clone(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            purpose: self.purpose.clone(),
            success_ttl: self.success_ttl,
            failure_ttl: self.failure_ttl,
            extractor: Arc::clone(&self.extractor),
            outcome_builder: Arc::clone(&self.outcome_builder),
        }
    }
}

impl<K> fmt::Debug for ApiKeyOptions<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyOptions")
            .field("scheme", &self.scheme)
            .field("purpose", &self.purpose)
            .field("success_ttl", &self.success_ttl)
            .field("failure_ttl", &self.failure_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use apikey_authn_sdk::DefaultApiKey;
    use http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

    use super::*;
    use crate::config::TokenSource;

    #[test]
    fn defaults_match_config_defaults() {
        let options = ApiKeyOptions::<DefaultApiKey>::default();

        assert_eq!(options.scheme, "x-api-key");
        assert_eq!(options.purpose, "x-api-key");
        assert!(options.success_ttl.is_none());
        assert_eq!(options.failure_ttl, Duration::from_secs(10));
    }

    #[test]
    fn failure_ttl_is_capped_by_success_ttl() {
        let options = ApiKeyOptions::<DefaultApiKey>::default()
            .with_success_ttl(Some(Duration::from_secs(5)))
            .with_failure_ttl(Duration::from_secs(30));
        assert_eq!(options.effective_failure_ttl(), Duration::from_secs(5));

        let options = options.with_failure_ttl(Duration::from_secs(1));
        assert_eq!(options.effective_failure_ttl(), Duration::from_secs(1));
    }

    #[test]
    fn from_config_selects_extractor() {
        let cfg = ApiKeyAuthConfig {
            token_source: TokenSource::Bearer,
            success_ttl: Some(Duration::from_secs(10)),
            ..ApiKeyAuthConfig::default()
        };

        let options = ApiKeyOptions::<DefaultApiKey>::from_config(&cfg).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(options.extractor.extract(&headers).as_deref(), Some("tok"));
        assert_eq!(options.success_ttl, Some(Duration::from_secs(10)));
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let cfg = ApiKeyAuthConfig {
            scheme: " ".to_owned(),
            ..ApiKeyAuthConfig::default()
        };

        assert!(ApiKeyOptions::<DefaultApiKey>::from_config(&cfg).is_err());
    }
}
