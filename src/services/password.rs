//! Password hashing and validation
//!
//! Passwords are hashed with Argon2id and stored as PHC strings. Before a
//! password is hashed it must pass [`validate_password`].

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

/// Minimum accepted password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password using Argon2id with secure defaults.
///
/// Returns the PHC string (algorithm, parameters, salt and hash).
///
/// # Example
///
/// ```ignore
/// use mentora::services::password::hash_password;
///
/// let hash = hash_password("my_secure_password")?;
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns an error if the stored hash is not a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

/// Throwaway hash checked on a username miss.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("mentora-unknown-account").ok());

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH.as_deref()
}

/// Run a full Argon2 verification for a username that has no stored hash,
/// so the miss takes as long as a wrong password. Always `false`.
pub fn verify_dummy(password: &str) -> bool {
    if let Some(hash) = dummy_hash() {
        let _ = verify_password(password, hash);
    }
    false
}

/// Check a new password against the account's username.
///
/// Returns every rule the password breaks; an empty list means it is valid.
pub fn validate_password(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.to_lowercase().contains(&username.to_lowercase()) {
        problems.push("The password is too similar to the username.".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2id_hash() {
        let hash = hash_password("test_password_123").expect("Failed to hash password");
        assert!(hash.starts_with("$argon2id$"), "Hash should use Argon2id");
    }

    #[test]
    fn test_hash_password_produces_different_hashes() {
        let hash1 = hash_password("same_password").expect("Failed to hash password");
        let hash2 = hash_password("same_password").expect("Failed to hash password");
        assert_ne!(hash1, hash2, "Random salt should produce different hashes");
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("Secret123!").expect("Failed to hash password");

        assert!(verify_password("Secret123!", &hash).unwrap());
        assert!(!verify_password("secret123!", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("password", "invalid_hash_format");
        assert!(result.is_err(), "Invalid hash format should return error");
    }

    #[test]
    fn test_verify_dummy_runs_real_hash_and_never_matches() {
        let hash = dummy_hash().expect("dummy hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_dummy("mentora-unknown-account"));
        assert!(!verify_dummy(""));
    }

    #[test]
    fn test_hash_password_unicode() {
        let password = "пароль🔐тест";
        let hash = hash_password(password).expect("Failed to hash unicode password");
        assert!(verify_password(password, &hash).unwrap());
    }

    #[test]
    fn test_validate_password_accepts_good_password() {
        assert!(validate_password("Secret123!", "alice").is_empty());
    }

    #[test]
    fn test_validate_password_rules() {
        assert_eq!(validate_password("short", "alice").len(), 1);
        assert_eq!(
            validate_password("12345678", "alice"),
            vec!["This password is entirely numeric.".to_string()]
        );
        assert_eq!(
            validate_password("xxALICExx", "alice"),
            vec!["The password is too similar to the username.".to_string()]
        );
        // Short and numeric at once
        assert_eq!(validate_password("123", "alice").len(), 2);
    }
}
