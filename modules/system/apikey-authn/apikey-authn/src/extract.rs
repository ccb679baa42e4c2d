//! Token extraction strategies.

use std::borrow::Cow;

use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, InvalidHeaderName};

use crate::config::{ApiKeyAuthConfig, DEFAULT_HEADER_NAME, TokenSource};

/// Finds the candidate API key in a request.
///
/// Returning `None` means "no key provided", which is a normal rejection,
/// not an error. A present value that is not valid text is still a
/// candidate; it comes back lossily decoded and fails to open as a key.
pub trait TokenExtractor: Send + Sync {
    fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<Cow<'a, str>>;
}

/// Apply `select` to the lossily decoded header value, borrowing when the
/// value is valid UTF-8.
fn select_token<'a>(
    value: &'a HeaderValue,
    select: fn(&str) -> Option<&str>,
) -> Option<Cow<'a, str>> {
    match String::from_utf8_lossy(value.as_bytes()) {
        Cow::Borrowed(text) => select(text).map(Cow::Borrowed),
        Cow::Owned(text) => select(&text).map(|token| Cow::Owned(token.to_owned())),
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let token = value.trim();
    (!token.is_empty()).then_some(token)
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    non_blank(token)
}

/// Reads the key from a dedicated header (`x-api-key` by default).
#[derive(Debug, Clone)]
pub struct HeaderExtractor {
    name: HeaderName,
}

impl HeaderExtractor {
    #[must_use]
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }

    /// # Errors
    ///
    /// Returns an error if `name` is not a valid header name.
    pub fn from_name(name: &str) -> Result<Self, InvalidHeaderName> {
        HeaderName::from_bytes(name.as_bytes()).map(Self::new)
    }

    #[must_use]
    pub fn header_name(&self) -> &HeaderName {
        &self.name
    }
}

impl Default for HeaderExtractor {
    fn default() -> Self {
        Self::new(HeaderName::from_static(DEFAULT_HEADER_NAME))
    }
}

impl TokenExtractor for HeaderExtractor {
    fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<Cow<'a, str>> {
        select_token(headers.get(&self.name)?, non_blank)
    }
}

/// Reads the key from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerExtractor;

impl TokenExtractor for BearerExtractor {
    fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<Cow<'a, str>> {
        select_token(headers.get(AUTHORIZATION)?, bearer_token)
    }
}

/// Build the extractor selected by `cfg`.
///
/// # Errors
///
/// Returns an error if `cfg.header_name` is not a valid header name.
pub fn extractor_from_config(
    cfg: &ApiKeyAuthConfig,
) -> Result<Box<dyn TokenExtractor>, InvalidHeaderName> {
    Ok(match cfg.token_source {
        TokenSource::Header => Box::new(HeaderExtractor::from_name(&cfg.header_name)?),
        TokenSource::Bearer => Box::new(BearerExtractor),
    })
}
