#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! AEAD Data Protection Plugin
//!
//! Supplies the [`DataProtectionProvider`](apikey_authn_sdk::DataProtectionProvider)
//! that `apikey_authn` seals and opens tokens with.
//!
//! - `ChaCha20-Poly1305` authenticated encryption with a random 96-bit nonce per token
//! - One HKDF-SHA256 subkey per purpose, derived from a single master key
//! - Expiry sealed inside the ciphertext and checked on every open
//!
//! ## Configuration
//!
//! ```yaml
//! protector:
//!   master_key: "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
//!   default_ttl: "90days"   # omit for tokens that never expire
//! ```

pub mod config;
pub mod domain;

pub use config::AeadProtectorConfig;
pub use domain::{AeadDataProtector, AeadProtectionProvider, parse_master_key};
