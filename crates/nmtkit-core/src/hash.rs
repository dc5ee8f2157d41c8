//! Hash helpers with optional salting.
//!
//! - [`secure_hash`] needs a secret and suits masking credentials or tokens.
//! - [`fingerprint_hash`] needs no secret and suits cache keys and identifiers.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `salt ‖ value` keyed with `secret_key`.
pub fn secure_hash(value: &[u8], secret_key: &[u8], salt: &[u8]) -> String {
    // HMAC accepts keys of any length, including empty.
    let mut mac = match HmacSha256::new_from_slice(secret_key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    };
    mac.update(salt);
    mac.update(value);
    hex::encode(mac.finalize().into_bytes())
}

/// Hex SHA-256 of `salt ‖ value`.
pub fn fingerprint_hash(value: &[u8], salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(value);
    hex::encode(hasher.finalize())
}
