//! The API key authentication state machine.
//!
//! ```text
//! no token        -> Rejected(NoKeyProvided)
//! token           -> cache hit                 -> stored outcome
//!                 -> open fails / parse fails  -> Rejected(InvalidKey)
//!                 -> key recovered             -> outcome builder
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use apikey_authn_sdk::{
    ApiKeyAuthError, AuthenticationOutcome, DataProtectionProvider, IdentityKey, RejectReason,
};
use chrono::{DateTime, Utc};
use http::HeaderMap;

use crate::cache::{CacheKey, DecisionCache};
use crate::options::ApiKeyOptions;
use crate::protector::KeyProtector;

/// Validates API keys and turns them into authentication decisions.
///
/// Generic over the identity key type carried in tokens. Every failure to
/// open or parse a token yields the same `Rejected(InvalidKey)`; the cause
/// is only logged at debug level.
pub struct ApiKeyAuthenticator<K> {
    options: ApiKeyOptions<K>,
    protector: KeyProtector,
    cache: Option<Arc<DecisionCache>>,
}

impl<K: IdentityKey> ApiKeyAuthenticator<K> {
    /// Create an authenticator with a private decision cache, if caching is
    /// enabled by `options.success_ttl`.
    #[must_use]
    pub fn new(provider: &dyn DataProtectionProvider, options: ApiKeyOptions<K>) -> Self {
        let cache = options
            .success_ttl
            .map(|_| Arc::new(DecisionCache::new()));
        Self::build(provider, options, cache)
    }

    /// Create an authenticator that stores decisions in a shared cache.
    ///
    /// The cache is ignored when `options.success_ttl` is unset.
    #[must_use]
    pub fn with_cache(
        provider: &dyn DataProtectionProvider,
        options: ApiKeyOptions<K>,
        cache: Arc<DecisionCache>,
    ) -> Self {
        let cache = options.success_ttl.map(|_| cache);
        Self::build(provider, options, cache)
    }

    fn build(
        provider: &dyn DataProtectionProvider,
        options: ApiKeyOptions<K>,
        cache: Option<Arc<DecisionCache>>,
    ) -> Self {
        let protector = KeyProtector::new(provider, &options.purpose);
        tracing::debug!(
            scheme = %options.scheme,
            purpose = %options.purpose,
            caching = cache.is_some(),
            "api key authenticator created"
        );
        Self {
            options,
            protector,
            cache,
        }
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.options.scheme
    }

    #[must_use]
    pub fn options(&self) -> &ApiKeyOptions<K> {
        &self.options
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<DecisionCache>> {
        self.cache.as_ref()
    }

    /// Authenticate a request by its headers.
    ///
    /// # Errors
    ///
    /// Returns the outcome builder's error. Missing or invalid keys are not
    /// errors; they come back as [`AuthenticationOutcome::Rejected`].
    #[tracing::instrument(skip_all, fields(scheme = %self.options.scheme))]
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> Result<AuthenticationOutcome, ApiKeyAuthError> {
        match self.options.extractor.extract(headers) {
            Some(token) => self.resolve(&token).await,
            None => Ok(no_key()),
        }
    }

    /// Authenticate a raw token obtained by other means.
    ///
    /// A blank token counts as no key.
    ///
    /// # Errors
    ///
    /// Returns the outcome builder's error.
    #[tracing::instrument(skip_all, fields(scheme = %self.options.scheme))]
    pub async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<AuthenticationOutcome, ApiKeyAuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(no_key());
        }
        self.resolve(token).await
    }

    async fn resolve(&self, token: &str) -> Result<AuthenticationOutcome, ApiKeyAuthError> {
        let (Some(cache), Some(success_ttl)) = (&self.cache, self.options.success_ttl) else {
            return self.evaluate(token).await.map(|(outcome, _)| outcome);
        };

        let key = CacheKey::new(self.protector.purpose(), token);
        cache
            .get_or_evaluate(key, || async move {
                let (outcome, expires_at) = self.evaluate(token).await?;
                let ttl = self.entry_ttl(&outcome, expires_at, success_ttl);
                Ok((outcome, ttl))
            })
            .await
    }

    async fn evaluate(
        &self,
        token: &str,
    ) -> Result<(AuthenticationOutcome, Option<DateTime<Utc>>), ApiKeyAuthError> {
        let Some((key, expires_at)) = self.decode(token) else {
            return Ok((AuthenticationOutcome::Rejected(RejectReason::InvalidKey), None));
        };

        let outcome = self
            .options
            .outcome_builder
            .build_outcome(&self.options.scheme, key)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "outcome builder failed"))?;

        if let AuthenticationOutcome::Rejected(reason) = &outcome {
            tracing::debug!(%reason, "api key denied by outcome builder");
        }
        Ok((outcome, expires_at))
    }

    /// Open the token and recover its key. Crypto failures short-circuit
    /// before any payload parsing.
    fn decode(&self, token: &str) -> Option<(K, Option<DateTime<Utc>>)> {
        let opened = self
            .protector
            .open(token)
            .inspect_err(|e| tracing::debug!(error = %e, "api key rejected"))
            .ok()?;

        let Some(key) = K::try_parse_token_bytes(&opened.payload) else {
            tracing::debug!("api key rejected: unrecognized key payload");
            return None;
        };
        Some((key, opened.expires_at))
    }

    /// How long a decision may be served from the cache.
    fn entry_ttl(
        &self,
        outcome: &AuthenticationOutcome,
        expires_at: Option<DateTime<Utc>>,
        success_ttl: Duration,
    ) -> Duration {
        if !outcome.is_accepted() {
            return self.options.effective_failure_ttl();
        }
        match expires_at {
            // Never serve an accepted decision past the token's own expiry.
            Some(at) => (at - Utc::now())
                .to_std()
                .map_or(Duration::ZERO, |left| left.min(success_ttl)),
            None => success_ttl,
        }
    }
}

fn no_key() -> AuthenticationOutcome {
    tracing::debug!("no api key provided");
    AuthenticationOutcome::Rejected(RejectReason::NoKeyProvided)
}

impl<K> fmt::Debug for ApiKeyAuthenticator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuthenticator")
            .field("options", &self.options)
            .field("protector", &self.protector)
            .field("cache", &self.cache)
            .finish()
    }
}
