//! Outcome builder API.
//!
//! After a token has been opened and its key parsed, the authenticator hands
//! the key to an [`OutcomeBuilder`], which makes the final accept/reject
//! decision. Builders may consult external identity stores, so the call is
//! asynchronous and is the only suspension point of an authentication.

use std::future::Future;

use async_trait::async_trait;

use crate::error::ApiKeyAuthError;
use crate::models::{AuthenticationOutcome, Principal};

/// Turns a recovered identity key into an authentication decision.
///
/// ```ignore
/// struct RevocationCheck { store: Arc<dyn RevocationStore> }
///
/// #[async_trait]
/// impl OutcomeBuilder<UserIdKey<Uuid>> for RevocationCheck {
///     async fn build_outcome(&self, scheme: &str, key: UserIdKey<Uuid>)
///         -> Result<AuthenticationOutcome, ApiKeyAuthError>
///     {
///         if self.store.is_revoked(key.user_id()).await? {
///             return Ok(AuthenticationOutcome::denied("key revoked"));
///         }
///         Ok(AuthenticationOutcome::accepted(
///             Principal::builder(scheme).subject(key.user_id().to_string()).build(),
///         ))
///     }
/// }
/// ```
#[async_trait]
pub trait OutcomeBuilder<K>: Send + Sync {
    /// Build the decision for `key`, recovered under authentication `scheme`.
    ///
    /// # Errors
    ///
    /// Builder-defined. Errors are propagated to the caller and never cached;
    /// they must not be turned into an accepted outcome.
    async fn build_outcome(
        &self,
        scheme: &str,
        key: K,
    ) -> Result<AuthenticationOutcome, ApiKeyAuthError>;
}

/// Builder used when none is configured: accepts every recovered key with a
/// principal that carries nothing beyond the scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOutcomeBuilder;

#[async_trait]
impl<K: Send + 'static> OutcomeBuilder<K> for DefaultOutcomeBuilder {
    async fn build_outcome(
        &self,
        scheme: &str,
        _key: K,
    ) -> Result<AuthenticationOutcome, ApiKeyAuthError> {
        Ok(AuthenticationOutcome::accepted(Principal::authenticated(
            scheme,
        )))
    }
}

/// [`OutcomeBuilder`] backed by an async closure. Created by [`outcome_fn`].
#[derive(Clone)]
pub struct OutcomeFn<F>(F);

/// Wrap an async closure taking the recovered key as an [`OutcomeBuilder`].
pub fn outcome_fn<K, F, Fut>(f: F) -> OutcomeFn<F>
where
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AuthenticationOutcome, ApiKeyAuthError>> + Send,
{
    OutcomeFn(f)
}

#[async_trait]
impl<K, F, Fut> OutcomeBuilder<K> for OutcomeFn<F>
where
    K: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AuthenticationOutcome, ApiKeyAuthError>> + Send,
{
    async fn build_outcome(
        &self,
        _scheme: &str,
        key: K,
    ) -> Result<AuthenticationOutcome, ApiKeyAuthError> {
        (self.0)(key).await
    }
}
