use warbler_db::Database;
use warbler_types::models::User;

use crate::error::StoreError;
use crate::hash::CredentialHasher;
use crate::identity::{IdentityStore, NewUser};

/// Identity hasher: keeps the password as-is so suites skip the KDF cost.
/// The real Argon2 path has its own coverage.
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, StoreError> {
        Ok(password.to_string())
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        password == digest
    }
}

pub fn test_db() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn store() -> IdentityStore {
    IdentityStore::new(Box::new(PlainHasher))
}

/// Signs up `<username>@email.com` with password "password".
pub fn signup_sample(db: &Database, store: &IdentityStore, username: &str) -> User {
    let email = format!("{username}@email.com");
    db.transaction(|tx| store.signup(tx, NewUser::new(username, &email, "password")))
        .unwrap()
}
