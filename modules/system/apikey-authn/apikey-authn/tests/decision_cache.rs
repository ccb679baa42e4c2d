#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Decision cache behavior seen through the authenticator
//!
//! These tests verify that:
//! 1. Accepted and rejected decisions are reused for their own TTLs
//! 2. Concurrent requests for one token share a single evaluation
//! 3. Cancelled or failed evaluations are not cached
//! 4. An accepted decision never outlives the token it was made for
//! 5. One cache can serve authenticators with different purposes
//!
//! Tokio time is paused; cache expiry follows `tokio::time::advance`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aead_protector_plugin::AeadProtectionProvider;
use apikey_authn::{
    ApiKeyAuthenticator, ApiKeyGenerator, ApiKeyGeneratorConfig, ApiKeyOptions, DecisionCache,
};
use apikey_authn_sdk::{
    ApiKeyAuthError, AuthenticationOutcome, DataProtectionProvider, DataProtector,
    DefaultApiKey, Principal, ProtectorError, RejectReason, UserIdKey, outcome_fn,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};

/// Counts how many tokens reach the cipher.
struct CountingProvider {
    inner: AeadProtectionProvider,
    opens: Arc<AtomicUsize>,
}

struct CountingProtector {
    inner: Arc<dyn DataProtector>,
    opens: Arc<AtomicUsize>,
}

impl DataProtector for CountingProtector {
    fn protect(
        &self,
        plaintext: &[u8],
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>, ProtectorError> {
        self.inner.protect(plaintext, expires_at)
    }

    fn unprotect(&self, protected: &[u8]) -> Result<apikey_authn_sdk::Unprotected, ProtectorError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.unprotect(protected)
    }
}

impl DataProtectionProvider for CountingProvider {
    fn create_protector(&self, purpose: &str) -> Arc<dyn DataProtector> {
        Arc::new(CountingProtector {
            inner: self.inner.create_protector(purpose),
            opens: Arc::clone(&self.opens),
        })
    }
}

fn counting_provider() -> (CountingProvider, Arc<AtomicUsize>) {
    let opens = Arc::new(AtomicUsize::new(0));
    let provider = CountingProvider {
        inner: AeadProtectionProvider::new([0x33; 32]),
        opens: Arc::clone(&opens),
    };
    (provider, opens)
}

fn issue(provider: &dyn DataProtectionProvider, purpose: &str, ttl: Duration) -> String {
    ApiKeyGenerator::new(
        provider,
        &ApiKeyGeneratorConfig {
            purpose: purpose.to_owned(),
        },
    )
    .protect_key_for(&DefaultApiKey, ttl)
    .unwrap()
}

fn bogus_token() -> String {
    STANDARD.encode([0xab; 48])
}

#[tokio::test(start_paused = true)]
async fn success_and_failure_use_their_own_ttls() {
    let (provider, opens) = counting_provider();
    let valid = issue(&provider, "x-api-key", Duration::from_secs(3600));
    let invalid = bogus_token();
    let auth = ApiKeyAuthenticator::<DefaultApiKey>::new(
        &provider,
        ApiKeyOptions::default()
            .with_success_ttl(Some(Duration::from_secs(10)))
            .with_failure_ttl(Duration::from_secs(1)),
    );

    assert!(auth.authenticate_token(&valid).await.unwrap().is_accepted());
    assert!(auth.authenticate_token(&valid).await.unwrap().is_accepted());
    assert_eq!(opens.load(Ordering::SeqCst), 1, "second valid lookup is a hit");

    assert!(!auth.authenticate_token(&invalid).await.unwrap().is_accepted());
    assert!(!auth.authenticate_token(&invalid).await.unwrap().is_accepted());
    assert_eq!(opens.load(Ordering::SeqCst), 2, "invalid token cached within 1s");

    tokio::time::advance(Duration::from_millis(1100)).await;

    assert!(!auth.authenticate_token(&invalid).await.unwrap().is_accepted());
    assert!(auth.authenticate_token(&valid).await.unwrap().is_accepted());
    assert_eq!(
        opens.load(Ordering::SeqCst),
        3,
        "only the invalid token is re-evaluated after 1s"
    );

    tokio::time::advance(Duration::from_secs(9)).await;

    assert!(auth.authenticate_token(&valid).await.unwrap().is_accepted());
    assert_eq!(opens.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn caching_disabled_evaluates_every_time() {
    let (provider, opens) = counting_provider();
    let valid = issue(&provider, "x-api-key", Duration::from_secs(60));
    let auth = ApiKeyAuthenticator::<DefaultApiKey>::new(&provider, ApiKeyOptions::default());

    for _ in 0..3 {
        assert!(auth.authenticate_token(&valid).await.unwrap().is_accepted());
    }

    assert_eq!(opens.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_evaluation() {
    let (provider, opens) = counting_provider();
    let token = issue(&provider, "x-api-key", Duration::from_secs(60));
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let auth = Arc::new(ApiKeyAuthenticator::new(
        &provider,
        ApiKeyOptions::<DefaultApiKey>::default()
            .with_success_ttl(Some(Duration::from_secs(10)))
            .with_outcome_builder(outcome_fn(move |_key: DefaultApiKey| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(AuthenticationOutcome::accepted(Principal::authenticated(
                        "x-api-key",
                    )))
                }
            })),
    ));

    let outcomes = futures::future::join_all((0..16).map(|_| {
        let auth = Arc::clone(&auth);
        let token = token.clone();
        tokio::spawn(async move { auth.authenticate_token(&token).await })
    }))
    .await;

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    let outcomes: Vec<_> = outcomes
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    let first = outcomes[0].principal().unwrap();
    for outcome in &outcomes {
        assert!(Arc::ptr_eq(first, outcome.principal().unwrap()));
    }
}

#[tokio::test(start_paused = true)]
async fn cancelled_evaluation_is_not_cached() {
    let (provider, _opens) = counting_provider();
    let token = issue(&provider, "x-api-key", Duration::from_secs(60));
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let auth = ApiKeyAuthenticator::new(
        &provider,
        ApiKeyOptions::<DefaultApiKey>::default()
            .with_success_ttl(Some(Duration::from_secs(10)))
            .with_outcome_builder(outcome_fn(move |_key: DefaultApiKey| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                    }
                    Ok(AuthenticationOutcome::accepted(Principal::authenticated(
                        "x-api-key",
                    )))
                }
            })),
    );

    let timed_out =
        tokio::time::timeout(Duration::from_millis(10), auth.authenticate_token(&token)).await;
    assert!(timed_out.is_err());

    let outcome = auth.authenticate_token(&token).await.unwrap();

    assert!(outcome.is_accepted());
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn builder_error_is_not_cached() {
    let (provider, _opens) = counting_provider();
    let token = issue(&provider, "x-api-key", Duration::from_secs(60));
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let auth = ApiKeyAuthenticator::new(
        &provider,
        ApiKeyOptions::<DefaultApiKey>::default()
            .with_success_ttl(Some(Duration::from_secs(10)))
            .with_outcome_builder(outcome_fn(move |_key: DefaultApiKey| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err(ApiKeyAuthError::OutcomeBuilder("flaky".to_owned()));
                    }
                    Ok(AuthenticationOutcome::accepted(Principal::authenticated(
                        "x-api-key",
                    )))
                }
            })),
    );

    assert!(auth.authenticate_token(&token).await.is_err());
    assert!(auth.authenticate_token(&token).await.unwrap().is_accepted());
    assert!(auth.authenticate_token(&token).await.unwrap().is_accepted());

    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn accepted_entry_expires_with_token() {
    let (provider, opens) = counting_provider();
    let token = issue(&provider, "x-api-key", Duration::from_secs(2));
    let auth = ApiKeyAuthenticator::<DefaultApiKey>::new(
        &provider,
        ApiKeyOptions::default().with_success_ttl(Some(Duration::from_secs(3600))),
    );

    assert!(auth.authenticate_token(&token).await.unwrap().is_accepted());
    assert!(auth.authenticate_token(&token).await.unwrap().is_accepted());
    assert_eq!(opens.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_secs(2)).await;

    auth.authenticate_token(&token).await.unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn shared_cache_keeps_purposes_apart() {
    let (provider, _opens) = counting_provider();
    let cache = Arc::new(DecisionCache::new());
    let options = |purpose: &str| ApiKeyOptions::<UserIdKey<u64>> {
        purpose: purpose.to_owned(),
        ..ApiKeyOptions::default().with_success_ttl(Some(Duration::from_secs(60)))
    };
    let billing =
        ApiKeyAuthenticator::with_cache(&provider, options("billing"), Arc::clone(&cache));
    let reports =
        ApiKeyAuthenticator::with_cache(&provider, options("reports"), Arc::clone(&cache));

    let token = ApiKeyGenerator::new(
        &provider,
        &ApiKeyGeneratorConfig {
            purpose: "billing".to_owned(),
        },
    )
    .protect_key(&UserIdKey::new(5_u64))
    .unwrap();

    assert!(billing.authenticate_token(&token).await.unwrap().is_accepted());
    assert_eq!(
        reports.authenticate_token(&token).await.unwrap(),
        AuthenticationOutcome::Rejected(RejectReason::InvalidKey)
    );
    assert!(billing.authenticate_token(&token).await.unwrap().is_accepted());
    assert_eq!(cache.len(), 2);
}
