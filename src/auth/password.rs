/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and the registration password policy.

use bcrypt::{hash, verify};
use thiserror::Error;

/// Cost used when configuration does not override it.
pub const DEFAULT_HASH_COST: u32 = 10;

const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

/// bcrypt only reads this many bytes of a secret.
pub const MAX_SECRET_BYTES: usize = 72;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password does not match digest")]
    CredentialMismatch,
    #[error("stored digest is malformed: {0}")]
    MalformedDigest(String),
    #[error("secret exceeds 72 bytes")]
    SecretTooLong,
    #[error("password must be at least 8 characters")]
    TooShort,
    #[error("hash cost {0} is outside 4..=31")]
    CostNotAllowed(u32),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Salted, deliberately slow one-way hashing of credentials.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// # Errors
    /// Returns `CostNotAllowed` if `cost` is outside bcrypt's range
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
            return Err(PasswordError::CostNotAllowed(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a secret into a self-describing bcrypt digest
    ///
    /// # Errors
    /// Returns error if the secret is longer than bcrypt can read or hashing fails
    pub fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        if secret.len() > MAX_SECRET_BYTES {
            return Err(PasswordError::SecretTooLong);
        }

        hash(secret, self.cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Verify a secret against a digest produced by [`PasswordHasher::hash`]
    ///
    /// The digest comparison is constant time. Secrets longer than
    /// `MAX_SECRET_BYTES` never match, since no digest was produced from one.
    ///
    /// # Errors
    /// - `CredentialMismatch` when the secret is wrong
    /// - `MalformedDigest` when `digest` is not a bcrypt digest
    pub fn verify(&self, secret: &str, digest: &str) -> Result<(), PasswordError> {
        if secret.len() > MAX_SECRET_BYTES {
            return Err(PasswordError::CredentialMismatch);
        }

        match verify(secret, digest) {
            Ok(true) => Ok(()),
            Ok(false) => Err(PasswordError::CredentialMismatch),
            Err(e) => Err(PasswordError::MalformedDigest(e.to_string())),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_HASH_COST,
        }
    }
}

/// Password policy applied at registration
///
/// Requirements:
/// - Minimum 8 characters
/// - At most 72 bytes (everything past that is ignored by bcrypt)
pub fn validate_password_policy(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }

    if password.len() > MAX_SECRET_BYTES {
        return Err(PasswordError::SecretTooLong);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Lowest cost keeps the suite fast
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_HASH_COST).expect("valid cost")
    }

    #[test]
    fn test_hash_password() {
        let password = "ValidPassword123";
        let digest = hasher().hash(password).expect("Failed to hash password");

        assert_ne!(password, digest);
        assert!(digest.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hasher = hasher();
        let digest = hasher.hash("ValidPassword123").expect("Failed to hash password");

        assert!(hasher.verify("ValidPassword123", &digest).is_ok());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = hasher();
        let digest = hasher.hash("ValidPassword123").expect("Failed to hash password");

        let result = hasher.verify("WrongPassword123", &digest);
        assert!(matches!(result, Err(PasswordError::CredentialMismatch)));
    }

    #[test]
    fn test_same_secret_different_salts() {
        let hasher = hasher();
        let first = hasher.hash("04234").expect("hash");
        let second = hasher.hash("04234").expect("hash");

        assert_ne!(first, second);
        assert!(hasher.verify("04234", &first).is_ok());
        assert!(hasher.verify("04234", &second).is_ok());
    }

    #[test]
    fn test_distinct_secrets_never_cross_verify() {
        let hasher = hasher();
        let secrets = ["", "a", "A", "password", "password ", "pässwörd", "12345678"];
        let digests: Vec<String> = secrets
            .iter()
            .map(|s| hasher.hash(s).expect("hash"))
            .collect();

        for (i, digest) in digests.iter().enumerate() {
            for (j, secret) in secrets.iter().enumerate() {
                let result = hasher.verify(secret, digest);
                if i == j {
                    assert!(result.is_ok(), "{secret:?} should verify");
                } else {
                    assert!(matches!(result, Err(PasswordError::CredentialMismatch)));
                }
            }
        }
    }

    #[test]
    fn test_malformed_digest() {
        let hasher = hasher();
        for digest in ["", "plaintext", "$2b$", "$2b$99$abcdefghijklmnopqrstuv"] {
            let result = hasher.verify("whatever", digest);
            assert!(
                matches!(result, Err(PasswordError::MalformedDigest(_))),
                "{digest:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_secret_past_bcrypt_limit() {
        let hasher = hasher();
        let at_limit = "x".repeat(MAX_SECRET_BYTES);
        let digest = hasher.hash(&at_limit).expect("hash");

        // Would match after truncation, must not
        let longer = format!("{}y", at_limit);
        assert!(matches!(
            hasher.verify(&longer, &digest),
            Err(PasswordError::CredentialMismatch)
        ));
        assert!(matches!(hasher.hash(&longer), Err(PasswordError::SecretTooLong)));
    }

    #[test]
    fn test_cost_bounds() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
        assert_eq!(PasswordHasher::new(10).expect("valid").cost(), 10);
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_HASH_COST);
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_policy("Short1").is_err());
        assert!(validate_password_policy(&"a".repeat(MAX_SECRET_BYTES + 1)).is_err());
        assert!(validate_password_policy("ValidPassword123").is_ok());
    }
}
