//! Password hashing (bcrypt) and password policy.

use crate::{AuthError, AuthResult, FieldError};

pub const MIN_PASSWORD_LEN: usize = 8;

/// bcrypt ignores input past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// bcrypt hasher with a fixed work factor.
///
/// Both operations are CPU-bound; async callers should run them on a blocking
/// thread.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    /// Costs outside bcrypt's supported range are clamped into it.
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    /// Cheapest accepted work factor. Tests and local tooling only.
    pub fn min_cost() -> Self {
        Self::new(MIN_COST)
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> AuthResult<String> {
        bcrypt::hash(password, self.cost).map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
    }

    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

/// Check a candidate password against the policy, reporting against `field`.
pub fn validate_password(field: &str, password: &str) -> Result<(), FieldError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldError::new(
            field,
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(FieldError::new(
            field,
            format!("must be at most {MAX_PASSWORD_BYTES} bytes"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hasher = PasswordHasher::min_cost();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$2"));
        assert_ne!(hash, "correct horse");
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hasher = PasswordHasher::min_cost();
        assert!(!hasher.verify("anything", "not-a-bcrypt-hash"));
        assert!(!hasher.verify("", ""));
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(PasswordHasher::new(1).cost(), 4);
        assert_eq!(PasswordHasher::new(99).cost(), 31);
        assert_eq!(PasswordHasher::new(10).cost(), 10);
    }

    #[test]
    fn policy_requires_eight_characters() {
        assert!(validate_password("password", "12345678").is_ok());
        let err = validate_password("new_password", "short").unwrap_err();
        assert_eq!(err.field, "new_password");
    }

    #[test]
    fn policy_caps_length_at_bcrypt_input_limit() {
        assert!(validate_password("password", &"a".repeat(MAX_PASSWORD_BYTES)).is_ok());
        let err = validate_password("password", &"a".repeat(MAX_PASSWORD_BYTES + 1)).unwrap_err();
        assert_eq!(err.message, "must be at most 72 bytes");

        // 24 three-byte characters fill the limit; one more crosses it.
        assert!(validate_password("password", &"€".repeat(24)).is_ok());
        assert!(validate_password("password", &"€".repeat(25)).is_err());
    }
}
