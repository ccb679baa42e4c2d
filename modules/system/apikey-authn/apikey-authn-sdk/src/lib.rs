#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! API key authentication SDK
//!
//! This crate provides the contracts shared by the `apikey_authn` module,
//! protector plugins, and consumers:
//!
//! - [`IdentityKey`] - Structured identity carried inside a token, with the
//!   built-in [`DefaultApiKey`], [`UserIdKey`] and [`CompositeKey`] variants
//! - [`DataProtectionProvider`] / [`DataProtector`] - Purpose-scoped,
//!   time-limited authenticated encryption supplied by a plugin
//! - [`OutcomeBuilder`] - Turns a recovered key into an authentication decision
//! - [`AuthenticationOutcome`] / [`Principal`] - Decision models
//! - [`ApiKeyAuthError`] / [`ProtectorError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use apikey_authn_sdk::{IdentityKey, UserIdKey};
//!
//! let key = UserIdKey::new(42_u64);
//! let bytes = key.to_token_bytes();
//! assert_eq!(UserIdKey::<u64>::try_parse_token_bytes(&bytes), Some(key));
//! ```

pub mod api;
pub mod error;
pub mod key;
pub mod models;
pub mod protector;

// Re-export main types at crate root
pub use api::{DefaultOutcomeBuilder, OutcomeBuilder, OutcomeFn, outcome_fn};
pub use error::{ApiKeyAuthError, ProtectorError};
pub use key::{COMPOSITE_KEY_VERSION, CompositeKey, DefaultApiKey, IdentityKey, UserIdKey};
pub use models::{AuthenticationOutcome, Principal, PrincipalBuilder, RejectReason};
pub use protector::{DataProtectionProvider, DataProtector, Unprotected};
