//! Decision cache.
//!
//! Memoizes the outcome of validating one raw token for a bounded time.
//! Entries are keyed by `(purpose, SHA-256(token))`, so raw tokens are never
//! retained and decisions made under one purpose are never served under
//! another.
//!
//! Each key maps to a shared [`OnceCell`]: concurrent lookups for the same
//! token wait on a single in-flight evaluation instead of repeating the
//! cryptographic work. The map guard is only held while the slot is fetched,
//! never across an await.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use apikey_authn_sdk::{ApiKeyAuthError, AuthenticationOutcome};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tokio::time::Instant;

/// New keys inserted between automatic sweeps of expired entries.
const SWEEP_INTERVAL: usize = 1024;

/// Upper bound for an entry's lifetime when `now + ttl` overflows.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Identifies one token under one purpose.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    purpose: Arc<str>,
    digest: [u8; 32],
}

impl CacheKey {
    #[must_use]
    pub fn new(purpose: &str, token: &str) -> Self {
        Self {
            purpose: Arc::from(purpose),
            digest: Sha256::digest(token.as_bytes()).into(),
        }
    }

    #[must_use]
    pub fn purpose(&self) -> &str {
        &self.purpose
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("purpose", &self.purpose)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct CachedDecision {
    outcome: AuthenticationOutcome,
    expires_at: Instant,
}

impl CachedDecision {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

type Slot = Arc<OnceCell<CachedDecision>>;

/// Shared, time-bounded memo of authentication decisions.
///
/// The cache is an explicit component: create one per process (or per
/// authenticator) and hand it out as `Arc<DecisionCache>`. Authenticators
/// with different purposes can share a single instance.
#[derive(Default)]
pub struct DecisionCache {
    entries: DashMap<CacheKey, Slot>,
    inserted: AtomicUsize,
}

impl DecisionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached outcome for `key`, or run `evaluate` to produce it.
    ///
    /// `evaluate` yields the outcome together with how long it may be reused.
    /// Only one evaluation runs per key at a time; other callers for the same
    /// key wait for it and share its result.
    ///
    /// If `evaluate` fails or its future is dropped before completing, nothing
    /// is stored and the next caller evaluates again.
    ///
    /// # Errors
    ///
    /// Returns whatever error `evaluate` produced.
    pub async fn get_or_evaluate<F, Fut>(
        &self,
        key: CacheKey,
        evaluate: F,
    ) -> Result<AuthenticationOutcome, ApiKeyAuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(AuthenticationOutcome, Duration), ApiKeyAuthError>>,
    {
        let slot = self.slot(key);
        let decision = slot
            .get_or_try_init(|| async move {
                let (outcome, ttl) = evaluate().await?;
                let now = Instant::now();
                let expires_at = now.checked_add(ttl).unwrap_or(now + FAR_FUTURE);
                Ok::<_, ApiKeyAuthError>(CachedDecision {
                    outcome,
                    expires_at,
                })
            })
            .await?;
        Ok(decision.outcome.clone())
    }

    /// Drop the entry for `key`. Returns whether an entry was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries and abandoned evaluation slots.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, slot| {
            let keep = match slot.get() {
                Some(decision) => !decision.is_expired(now),
                // Uninitialized and nobody waiting: a failed or cancelled evaluation.
                None => Arc::strong_count(slot) > 1,
            };
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "purged decision cache");
        }
        removed
    }

    /// Number of entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(&self, key: CacheKey) -> Slot {
        let now = Instant::now();
        let mut is_new = false;
        let slot = {
            let mut entry = self.entries.entry(key).or_insert_with(|| {
                is_new = true;
                Arc::new(OnceCell::new())
            });
            if entry.value().get().is_some_and(|d| d.is_expired(now)) {
                *entry.value_mut() = Arc::new(OnceCell::new());
            }
            Arc::clone(entry.value())
        };
        // The entry guard is released above; `retain` locks every shard.
        if is_new
            && self.inserted.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1
        {
            self.purge_expired();
        }
        slot
    }
}

impl fmt::Debug for DecisionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
