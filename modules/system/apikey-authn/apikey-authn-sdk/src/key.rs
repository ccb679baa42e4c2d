//! Identity keys carried inside protected tokens.
//!
//! A key is the only structured data an API key token holds. The protector
//! never looks inside it; the authenticator recovers it with
//! [`IdentityKey::try_parse_token_bytes`] after the token has been opened.

use std::fmt::Display;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Structured identity that can be sealed into an API key.
///
/// # Contract
///
/// - [`to_token_bytes`](Self::to_token_bytes) is deterministic and never fails
///   for a constructed key.
/// - [`try_parse_token_bytes`](Self::try_parse_token_bytes) is total: empty,
///   truncated or foreign payloads return `None`. It must never panic, since
///   payloads can come from corrupted or attacker-crafted tokens.
/// - The byte format is a bijection with the key value, so
///   `try_parse_token_bytes(&k.to_token_bytes()) == Some(k)`.
pub trait IdentityKey: Sized + Send + Sync + 'static {
    /// Serialize this key into its token payload.
    fn to_token_bytes(&self) -> Vec<u8>;

    /// Parse a token payload back into a key.
    fn try_parse_token_bytes(bytes: &[u8]) -> Option<Self>;
}

/// Payload-less sentinel key: holding a valid token is the whole identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DefaultApiKey;

const DEFAULT_API_KEY_PAYLOAD: [u8; 1] = [0x01];

impl IdentityKey for DefaultApiKey {
    fn to_token_bytes(&self) -> Vec<u8> {
        DEFAULT_API_KEY_PAYLOAD.to_vec()
    }

    fn try_parse_token_bytes(bytes: &[u8]) -> Option<Self> {
        (bytes == DEFAULT_API_KEY_PAYLOAD).then_some(Self)
    }
}

/// Key carrying a single user identifier.
///
/// The payload is the UTF-8 display form of the id. Only the canonical form
/// is accepted on parse: bytes that parse to a value whose display differs
/// (e.g. `"007"` for a `u64`) are rejected. Ids with an empty display form
/// cannot be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserIdKey<T> {
    user_id: T,
}

impl<T> UserIdKey<T> {
    /// Wrap `user_id`.
    ///
    /// An id whose display form is empty (e.g. `String::new()`) has no
    /// parseable token form; the generator refuses to issue a key for it.
    #[must_use]
    pub const fn new(user_id: T) -> Self {
        Self { user_id }
    }

    #[must_use]
    pub const fn user_id(&self) -> &T {
        &self.user_id
    }

    #[must_use]
    pub fn into_user_id(self) -> T {
        self.user_id
    }
}

impl<T> IdentityKey for UserIdKey<T>
where
    T: FromStr + Display + Send + Sync + 'static,
{
    fn to_token_bytes(&self) -> Vec<u8> {
        self.user_id.to_string().into_bytes()
    }

    fn try_parse_token_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let text = std::str::from_utf8(bytes).ok()?;
        let user_id = text.parse::<T>().ok()?;
        (user_id.to_string() == text).then(|| Self::new(user_id))
    }
}

/// Current version byte prefixed to [`CompositeKey`] payloads.
pub const COMPOSITE_KEY_VERSION: u8 = 1;

/// Key wrapping an arbitrary serde type, encoded with `postcard`.
///
/// Layout: `[COMPOSITE_KEY_VERSION] || postcard(value)`. The encoding is
/// computed once in [`CompositeKey::new`], so serialization cannot fail later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey<T> {
    value: T,
    encoded: Vec<u8>,
}

impl<T: Serialize> CompositeKey<T> {
    /// Wrap `value`, encoding it up front.
    ///
    /// # Errors
    ///
    /// Returns the `postcard` error if `value` cannot be serialized
    /// (e.g. a sequence of unknown length).
    pub fn new(value: T) -> Result<Self, postcard::Error> {
        let mut encoded = vec![COMPOSITE_KEY_VERSION];
        encoded = postcard::to_extend(&value, encoded)?;
        Ok(Self { value, encoded })
    }
}

impl<T> CompositeKey<T> {
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T> IdentityKey for CompositeKey<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn to_token_bytes(&self) -> Vec<u8> {
        self.encoded.clone()
    }

    fn try_parse_token_bytes(bytes: &[u8]) -> Option<Self> {
        let (&version, body) = bytes.split_first()?;
        if version != COMPOSITE_KEY_VERSION {
            return None;
        }
        let (value, rest) = postcard::take_from_bytes::<T>(body).ok()?;
        if !rest.is_empty() {
            return None;
        }
        // Reject overlong varints and other non-canonical encodings.
        let canonical = postcard::to_allocvec(&value).ok()?;
        if canonical != body {
            return None;
        }
        Some(Self {
            value,
            encoded: bytes.to_vec(),
        })
    }
}
