//! Master key decoding.

use base64::{Engine as _, engine::general_purpose};
use zeroize::Zeroizing;

pub const MASTER_KEY_LEN: usize = 32;

/// Decode a 32-byte master key from hex or base64.
///
/// Accepted forms, tried in order: 64 hex characters, URL-safe base64
/// (padded or not), standard base64 (padded or not). Raw passphrases are
/// not accepted.
///
/// # Errors
///
/// Returns an error if `raw` is in none of the accepted forms or does not
/// decode to exactly 32 bytes.
pub fn parse_master_key(raw: &str) -> anyhow::Result<Zeroizing<[u8; MASTER_KEY_LEN]>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("master key is empty");
    }

    if trimmed.len() == MASTER_KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes = Zeroizing::new(hex::decode(trimmed)?);
        return to_key(&bytes);
    }

    let engines = [
        &general_purpose::URL_SAFE_NO_PAD,
        &general_purpose::URL_SAFE,
        &general_purpose::STANDARD_NO_PAD,
        &general_purpose::STANDARD,
    ];
    for engine in engines {
        if let Ok(bytes) = engine.decode(trimmed) {
            let bytes = Zeroizing::new(bytes);
            if bytes.len() == MASTER_KEY_LEN {
                return to_key(&bytes);
            }
        }
    }

    anyhow::bail!("master key must be {MASTER_KEY_LEN} bytes encoded as hex or base64")
}

fn to_key(bytes: &[u8]) -> anyhow::Result<Zeroizing<[u8; MASTER_KEY_LEN]>> {
    let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
    if bytes.len() != MASTER_KEY_LEN {
        anyhow::bail!(
            "master key must be {MASTER_KEY_LEN} bytes, got {}",
            bytes.len()
        );
    }
    key.copy_from_slice(bytes);
    Ok(key)
}
