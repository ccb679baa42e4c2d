#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! API key authentication
//!
//! Stateless API keys: the key *is* the identity, sealed by a purpose-scoped
//! [`DataProtector`](apikey_authn_sdk::DataProtector). Validating a key
//! means opening it, recovering the [`IdentityKey`](apikey_authn_sdk::IdentityKey)
//! inside, and asking an [`OutcomeBuilder`](apikey_authn_sdk::OutcomeBuilder)
//! for the decision. Decisions can be memoized per token in a
//! [`DecisionCache`] with separate TTLs for accepted and rejected keys.
//!
//! ## Components
//!
//! - [`ApiKeyGenerator`] - Issues keys
//! - [`ApiKeyAuthenticator`] - Validates keys and builds decisions
//! - [`DecisionCache`] - Single-flight, time-bounded decision memo
//! - [`require_api_key`] / [`ApiKeyPrincipal`] - Axum integration
//!
//! ## Example
//!
//! ```ignore
//! use apikey_authn::{ApiKeyAuthenticator, ApiKeyGenerator, ApiKeyGeneratorConfig, ApiKeyOptions};
//! use apikey_authn_sdk::UserIdKey;
//!
//! let generator = ApiKeyGenerator::new(&provider, &ApiKeyGeneratorConfig::default());
//! let token = generator.protect_key_for(&UserIdKey::new(42_u64), Duration::from_secs(3600))?;
//!
//! let authenticator =
//!     ApiKeyAuthenticator::<UserIdKey<u64>>::new(&provider, ApiKeyOptions::default());
//! let outcome = authenticator.authenticate_token(&token).await?;
//! assert!(outcome.is_accepted());
//! ```

pub mod authenticator;
pub mod cache;
pub mod config;
pub mod extract;
pub mod generator;
pub mod middleware;
pub mod options;
pub mod problem;
pub mod protector;

pub use authenticator::ApiKeyAuthenticator;
pub use cache::{CacheKey, DecisionCache};
pub use config::{ApiKeyAuthConfig, ApiKeyGeneratorConfig, TokenSource};
pub use extract::{BearerExtractor, HeaderExtractor, TokenExtractor, extractor_from_config};
pub use generator::ApiKeyGenerator;
pub use middleware::{ApiKeyPrincipal, require_api_key};
pub use options::ApiKeyOptions;
pub use problem::Problem;
pub use protector::KeyProtector;
