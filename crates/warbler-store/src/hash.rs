use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::StoreError;

/// Pluggable credential hashing seam. Production uses Argon2id; tests swap in
/// a cheap double so suites do not pay the KDF cost on every signup.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, StoreError>;

    /// True iff `password` verifies against the stored digest. Comparison is
    /// delegated to the hashing primitive, which is constant-time-safe.
    fn verify(&self, password: &str, digest: &str) -> bool;
}

/// Argon2id with the crate's default parameters, PHC string output.
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, StoreError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| StoreError::Internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hasher = Argon2Hasher;
        let digest = hasher.hash("hunter2!").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("hunter2!", &digest));
        assert!(!hasher.verify("hunter3!", &digest));
    }

    #[test]
    fn garbage_digest_never_verifies() {
        let hasher = Argon2Hasher;
        assert!(!hasher.verify("anything", "not-a-phc-string"));
    }
}
