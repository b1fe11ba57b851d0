//! Password hashing via bcrypt.

use thiserror::Error;

/// Password hashing errors.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

/// Hash a password with bcrypt at the configured cost.
///
/// # Errors
///
/// Returns [`PasswordError`] if hashing fails (invalid cost, OS RNG).
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Verify a password against a bcrypt hash.
///
/// # Errors
///
/// Returns [`PasswordError`] if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(password, hash)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // bcrypt's minimum cost; keeps the test fast.
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2", TEST_COST).unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("hunter2", "not-a-bcrypt-hash").is_err());
    }
}
