//! Purpose-bound `ChaCha20-Poly1305` protector.
//!
//! Envelope layout:
//!
//! ```text
//! version (1) || nonce (12) || ChaCha20-Poly1305(expiry_ms_be (8) || payload) || tag (16)
//! ```
//!
//! The AAD is `version || purpose`, and the cipher key is already derived from
//! the purpose, so a payload sealed for one purpose fails authentication
//! under any other.

use std::time::Duration;

use apikey_authn_sdk::{DataProtector, ProtectorError, Unprotected};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use rand::RngCore;
use zeroize::Zeroizing;

const ENVELOPE_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const EXPIRY_LEN: usize = 8;
const HEADER_LEN: usize = 1 + NONCE_LEN;
const MIN_ENVELOPE_LEN: usize = HEADER_LEN + EXPIRY_LEN + TAG_LEN;

/// Expiry marker for payloads that never expire.
const NO_EXPIRY: i64 = i64::MAX;

/// [`DataProtector`] for a single purpose.
pub struct AeadDataProtector {
    cipher: ChaCha20Poly1305,
    aad: Vec<u8>,
    default_ttl: Option<Duration>,
}

impl AeadDataProtector {
    pub(crate) fn new(subkey: &[u8; 32], purpose: &str, default_ttl: Option<Duration>) -> Self {
        let mut aad = Vec::with_capacity(1 + purpose.len());
        aad.push(ENVELOPE_VERSION);
        aad.extend_from_slice(purpose.as_bytes());

        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(subkey)),
            aad,
            default_ttl,
        }
    }

    fn default_expiry(&self) -> Result<Option<DateTime<Utc>>, ProtectorError> {
        let Some(ttl) = self.default_ttl else {
            return Ok(None);
        };
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .map(Some)
            .ok_or_else(|| ProtectorError::Encryption("default ttl out of range".to_owned()))
    }
}

impl DataProtector for AeadDataProtector {
    fn protect(
        &self,
        plaintext: &[u8],
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<u8>, ProtectorError> {
        let expires_at = match expires_at {
            Some(at) => Some(at),
            None => self.default_expiry()?,
        };
        let expiry_ms = expires_at.map_or(NO_EXPIRY, |at| at.timestamp_millis());

        let mut sealed = Zeroizing::new(Vec::with_capacity(EXPIRY_LEN + plaintext.len()));
        sealed.extend_from_slice(&expiry_ms.to_be_bytes());
        sealed.extend_from_slice(plaintext);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &sealed,
                    aad: &self.aad,
                },
            )
            .map_err(|e| ProtectorError::Encryption(e.to_string()))?;

        let mut envelope = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        envelope.push(ENVELOPE_VERSION);
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    fn unprotect(&self, protected: &[u8]) -> Result<Unprotected, ProtectorError> {
        if protected.len() < MIN_ENVELOPE_LEN {
            return Err(ProtectorError::Malformed);
        }
        let (header, ciphertext) = protected.split_at(HEADER_LEN);
        let (&version, nonce) = header.split_first().ok_or(ProtectorError::Malformed)?;
        if version != ENVELOPE_VERSION {
            return Err(ProtectorError::Malformed);
        }

        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: &self.aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| ProtectorError::Tampered)?;

        let (expiry, payload) = plaintext.split_at(EXPIRY_LEN);
        let expiry: [u8; EXPIRY_LEN] = expiry.try_into().map_err(|_| ProtectorError::Malformed)?;
        let expiry_ms = i64::from_be_bytes(expiry);

        let expires_at = if expiry_ms == NO_EXPIRY {
            None
        } else {
            Some(DateTime::from_timestamp_millis(expiry_ms).ok_or(ProtectorError::Malformed)?)
        };
        if let Some(at) = expires_at
            && at <= Utc::now()
        {
            return Err(ProtectorError::Expired);
        }

        Ok(Unprotected {
            payload: payload.to_vec(),
            expires_at,
        })
    }
}
