// Password hashing (argon2, PHC string format)

use crate::core::errors::LedgerError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, LedgerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LedgerError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored PHC hash string.
///
/// A malformed stored hash is an internal error; a mismatch is `Ok(false)`.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, LedgerError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| LedgerError::Internal(format!("stored password hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
