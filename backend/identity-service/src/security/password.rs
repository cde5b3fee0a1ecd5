/// Password hashing and verification using Argon2id
use crate::error::{IdentityError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

/// Hash verified when no account matches, so the "unknown account" path
/// costs the same as the "wrong password" path.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    let secret = crypto_core::generate_opaque_token(16);
    hash_password(&secret).ok()
});

/// Compute the throwaway hash now so the first unknown-account login does not
/// pay for hashing on top of verifying. Returns whether it is available.
pub fn warm_up() -> bool {
    Lazy::force(&DUMMY_HASH).is_some()
}

/// Hash a password using Argon2id algorithm
///
/// ## Security
///
/// - Algorithm: Argon2id (default configuration)
/// - Salt: Random 16-byte salt generated per password
/// - Cost parameters are embedded in the PHC string, so later changes to
///   the defaults never invalidate stored hashes
///
/// ## Returns
///
/// PHC-formatted hash string safe for database storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IdentityError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against its hash
///
/// ## Security
///
/// - Uses constant-time comparison to prevent timing attacks
/// - Supports Argon2id PHC format
///
/// ## Returns
///
/// `true` if password matches hash, `false` otherwise
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| IdentityError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(IdentityError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

/// Verify against the stored hash, or against a throwaway hash when there is
/// no account. Never errors: a corrupt stored hash counts as a mismatch.
pub fn verify_password_or_dummy(password: &str, password_hash: Option<&str>) -> bool {
    match password_hash {
        Some(hash) => verify_password(password, hash).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Stored password hash could not be verified");
            false
        }),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, dummy);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_valid_password() {
        let password = "senha-forte-123";
        let hash = hash_password(password).expect("should hash password successfully");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("should verify successfully"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("senha-forte-123").expect("should hash password successfully");
        assert!(!verify_password("senha-errada", &hash).expect("verification should succeed"));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let password = "senha-forte-123";
        let hash1 = hash_password(password).expect("should hash successfully");
        let hash2 = hash_password(password).expect("should hash successfully");
        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("whatever", "not-a-phc-string"),
            Err(IdentityError::Internal(_))
        ));
        assert!(!verify_password_or_dummy("whatever", Some("not-a-phc-string")));
    }

    #[test]
    fn test_missing_account_never_verifies() {
        assert!(!verify_password_or_dummy("anything", None));
    }

    #[test]
    fn test_warm_up_computes_dummy_hash() {
        assert!(warm_up());
        let dummy = Lazy::get(&DUMMY_HASH).and_then(|h| h.as_deref());
        assert!(dummy.is_some_and(|h| h.starts_with("$argon2id$")));
    }
}
