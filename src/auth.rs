/// Credential hashing utilities
///
/// Secrets are stored as argon2id PHC strings with a per-hash random salt.
/// Verification recomputes the digest and compares in constant time; the raw
/// secret is never persisted or logged.
use crate::error::{CoreError, CoreResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a raw secret for storage.
pub fn hash_secret(secret: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| CoreError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a submitted secret against a stored PHC hash.
pub fn verify_secret(secret: &str, stored_hash: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| CoreError::Internal(format!("Stored hash is malformed: {}", e)))?;

    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
