//! API key verification against configured hashes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use nmtkit_core::settings::AuthSettings;

use crate::error::{AuthError, Result};
use crate::principal::AuthSuccess;

/// Hash algorithm name for argon2 PHC strings.
pub const ARGON2: &str = "argon2";

/// Verify `api_key` against a stored hash.
///
/// A mismatch, or a stored hash that cannot be parsed, is `Ok(false)`.
pub fn verify_api_key(algo: &str, api_key: &str, hash: &str) -> Result<bool> {
    match algo {
        ARGON2 => {
            let parsed = match PasswordHash::new(hash) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::warn!("Ignoring unparseable argon2 hash: {e}");
                    return Ok(false);
                }
            };
            Ok(Argon2::default()
                .verify_password(api_key.as_bytes(), &parsed)
                .is_ok())
        }
        other => Err(AuthError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Authenticate an API key against `settings.incoming.api_keys`.
///
/// Keys are tried in configuration order and the first match wins. A matching
/// key without ACLs is rejected.
pub fn authenticate_api_key(api_key: &str, settings: &AuthSettings) -> Result<AuthSuccess> {
    for (name, key_conf) in &settings.incoming.api_keys {
        if !verify_api_key(&key_conf.algo, api_key, &key_conf.hash)? {
            continue;
        }
        if key_conf.acls.is_empty() {
            return Err(AuthError::NotPermitted(
                "Invalid API key (no permissions)".to_string(),
            ));
        }
        log::debug!("Authenticated API key '{name}'");
        return Ok(AuthSuccess::new(name.clone(), key_conf.acls.clone()));
    }

    Err(AuthError::UnknownApiKey)
}

/// Hash an API key with argon2 and a random salt, for use in configuration.
pub fn hash_api_key(api_key: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(api_key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InvalidFormat(format!("argon2 hashing failed: {e}")))
}
