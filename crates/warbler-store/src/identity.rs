use rusqlite::{OptionalExtension, Row, Transaction, params};
use tracing::{debug, info};

use warbler_db::rows::UserRow;
use warbler_types::models::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, User};

use crate::error::StoreError;
use crate::hash::{Argon2Hasher, CredentialHasher};

/// Signup input. Only the credentials are mandatory; missing profile images
/// fall back to the system placeholders.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub image_url: Option<&'a str>,
    pub header_image_url: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub location: Option<&'a str>,
}

impl<'a> NewUser<'a> {
    pub fn new(username: &'a str, email: &'a str, password: &'a str) -> Self {
        Self {
            username,
            email,
            password,
            image_url: None,
            header_image_url: None,
            bio: None,
            location: None,
        }
    }
}

/// Profile edit; `None` leaves the field unchanged.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Owns user records and credential checks. Stateless apart from the hashing
/// seam; every operation runs against the caller's transaction, and the
/// caller decides when to commit.
pub struct IdentityStore {
    hasher: Box<dyn CredentialHasher>,
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new(Box::new(Argon2Hasher))
    }
}

impl IdentityStore {
    pub fn new(hasher: Box<dyn CredentialHasher>) -> Self {
        Self { hasher }
    }

    pub fn signup(&self, tx: &Transaction<'_>, new: NewUser<'_>) -> Result<User, StoreError> {
        if new.username.trim().is_empty() {
            return Err(StoreError::validation("username must not be empty"));
        }
        if new.password.is_empty() {
            return Err(StoreError::validation("password must not be empty"));
        }
        if !valid_email(new.email) {
            return Err(StoreError::validation("email address is not valid"));
        }

        if username_taken(tx, new.username, None)? {
            return Err(StoreError::validation("username already taken"));
        }
        if email_taken(tx, new.email, None)? {
            return Err(StoreError::validation("email already taken"));
        }

        let digest = self.hasher.hash(new.password)?;

        tx.execute(
            "INSERT INTO users (username, email, password, image_url, header_image_url, bio, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.username,
                new.email,
                digest,
                new.image_url.unwrap_or(DEFAULT_IMAGE_URL),
                new.header_image_url.unwrap_or(DEFAULT_HEADER_IMAGE_URL),
                new.bio,
                new.location,
            ],
        )
        // The UNIQUE constraints settle races the probes above cannot see.
        .map_err(|e| StoreError::constraint(e, "username or email already taken"))?;

        let id = tx.last_insert_rowid();
        self.get_user(tx, id)?.ok_or(StoreError::NotFound("user"))
    }

    /// `Ok(None)` for an unknown username or a wrong password — failed
    /// authentication is a negative result, not an error.
    pub fn authenticate(
        &self,
        tx: &Transaction<'_>,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let Some(user) = self.get_user_by_username(tx, username)? else {
            return Ok(None);
        };

        if self.hasher.verify(password, &user.password) {
            Ok(Some(user))
        } else {
            debug!("failed authentication for {}", username);
            Ok(None)
        }
    }

    pub fn update_profile(
        &self,
        tx: &Transaction<'_>,
        user_id: i64,
        update: ProfileUpdate,
        confirm_password: &str,
    ) -> Result<User, StoreError> {
        let current = self.get_user(tx, user_id)?.ok_or(StoreError::NotFound("user"))?;

        if !self.hasher.verify(confirm_password, &current.password) {
            return Err(StoreError::authorization("password confirmation does not match"));
        }

        if let Some(username) = &update.username {
            if username.trim().is_empty() {
                return Err(StoreError::validation("username must not be empty"));
            }
            if username_taken(tx, username, Some(user_id))? {
                return Err(StoreError::validation("username already taken"));
            }
        }
        if let Some(email) = &update.email {
            if !valid_email(email) {
                return Err(StoreError::validation("email address is not valid"));
            }
            if email_taken(tx, email, Some(user_id))? {
                return Err(StoreError::validation("email already taken"));
            }
        }

        tx.execute(
            "UPDATE users
             SET username = ?1, email = ?2, image_url = ?3, header_image_url = ?4,
                 bio = ?5, location = ?6
             WHERE id = ?7",
            params![
                update.username.as_deref().unwrap_or(&current.username),
                update.email.as_deref().unwrap_or(&current.email),
                update.image_url.as_deref().unwrap_or(&current.image_url),
                update
                    .header_image_url
                    .as_deref()
                    .unwrap_or(&current.header_image_url),
                update.bio.as_deref().or(current.bio.as_deref()),
                update.location.as_deref().or(current.location.as_deref()),
                user_id,
            ],
        )
        .map_err(|e| StoreError::constraint(e, "username or email already taken"))?;

        self.get_user(tx, user_id)?.ok_or(StoreError::NotFound("user"))
    }

    /// Cascade delete: the user's messages, likes they gave, likes their
    /// messages received, and follow edges in both directions all go in the
    /// same transaction. The FK `ON DELETE CASCADE` clauses backstop this.
    pub fn delete_user(&self, tx: &Transaction<'_>, user_id: i64) -> Result<(), StoreError> {
        if !user_exists(tx, user_id)? {
            return Err(StoreError::NotFound("user"));
        }

        info!("cascade deleting user #{}", user_id);

        tx.execute(
            "DELETE FROM likes
             WHERE user_id = ?1
                OR message_id IN (SELECT id FROM messages WHERE user_id = ?1)",
            [user_id],
        )?;
        tx.execute(
            "DELETE FROM follows
             WHERE user_being_followed_id = ?1 OR user_following_id = ?1",
            [user_id],
        )?;
        tx.execute("DELETE FROM messages WHERE user_id = ?1", [user_id])?;
        tx.execute("DELETE FROM users WHERE id = ?1", [user_id])?;

        Ok(())
    }

    pub fn get_user(&self, tx: &Transaction<'_>, id: i64) -> Result<Option<User>, StoreError> {
        let row = tx
            .query_row(
                "SELECT id, username, email, password, image_url, header_image_url,
                        bio, location, created_at
                 FROM users WHERE id = ?1",
                [id],
                map_user,
            )
            .optional()?;
        Ok(row.map(User::from))
    }

    pub fn get_user_by_username(
        &self,
        tx: &Transaction<'_>,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = tx
            .query_row(
                "SELECT id, username, email, password, image_url, header_image_url,
                        bio, location, created_at
                 FROM users WHERE username = ?1",
                [username],
                map_user,
            )
            .optional()?;
        Ok(row.map(User::from))
    }

    /// All users, or those whose username contains `q`, ordered by id.
    pub fn list_users(
        &self,
        tx: &Transaction<'_>,
        q: Option<&str>,
    ) -> Result<Vec<User>, StoreError> {
        let mut stmt = tx.prepare(
            "SELECT id, username, email, password, image_url, header_image_url,
                    bio, location, created_at
             FROM users
             WHERE ?1 IS NULL OR username LIKE '%' || ?1 || '%'
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([q], map_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn user_exists(tx: &Transaction<'_>, id: i64) -> Result<bool, StoreError> {
    let hit = tx
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(hit.is_some())
}

fn username_taken(
    tx: &Transaction<'_>,
    username: &str,
    exclude: Option<i64>,
) -> Result<bool, StoreError> {
    let hit = tx
        .query_row(
            "SELECT 1 FROM users WHERE username = ?1 AND (?2 IS NULL OR id != ?2)",
            params![username, exclude],
            |_| Ok(()),
        )
        .optional()?;
    Ok(hit.is_some())
}

fn email_taken(
    tx: &Transaction<'_>,
    email: &str,
    exclude: Option<i64>,
) -> Result<bool, StoreError> {
    let hit = tx
        .query_row(
            "SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2)",
            params![email, exclude],
            |_| Ok(()),
        )
        .optional()?;
    Ok(hit.is_some())
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{signup_sample, store, test_db};

    #[test]
    fn signup_then_authenticate_returns_same_user() {
        let db = test_db();
        let store = store();

        let created: User = db
            .transaction(|tx| store.signup(tx, NewUser::new("signup_user", "signup_user@email.com", "password")))
            .unwrap();

        let fetched = db
            .transaction(|tx| store.authenticate(tx, "signup_user", "password"))
            .unwrap()
            .expect("credentials should verify");

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.username, "signup_user");
    }

    #[test]
    fn authenticate_rejects_bad_credentials_without_error() {
        let db = test_db();
        let store = store();
        db.transaction(|tx| store.signup(tx, NewUser::new("signup_user", "signup_user@email.com", "password")))
            .unwrap();

        let wrong_user = db
            .transaction(|tx| store.authenticate(tx, "wrong", "password"))
            .unwrap();
        let wrong_password = db
            .transaction(|tx| store.authenticate(tx, "signup_user", "wrong"))
            .unwrap();

        assert!(wrong_user.is_none());
        assert!(wrong_password.is_none());
    }

    #[test]
    fn signup_rejects_duplicate_email() {
        let db = test_db();
        let store = store();
        db.transaction(|tx| store.signup(tx, NewUser::new("signup_user", "signup_user@email.com", "password")))
            .unwrap();

        let err = db
            .transaction(|tx| {
                store.signup(tx, NewUser::new("failed_signup_user", "signup_user@email.com", "password"))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        // exactly one matching user exists afterward
        let matching = db
            .transaction(|tx| store.list_users(tx, Some("signup")))
            .unwrap();
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn signup_rejects_empty_password_and_bad_email() {
        let db = test_db();
        let store = store();

        for new in [
            NewUser::new("u", "u@email.com", ""),
            NewUser::new("u", "not-an-email", "password"),
            NewUser::new("", "u@email.com", "password"),
        ] {
            let err = db.transaction(|tx| store.signup(tx, new)).unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
    }

    #[test]
    fn signup_applies_placeholder_images() {
        let db = test_db();
        let store = store();
        let user = db
            .transaction(|tx| store.signup(tx, NewUser::new("user1", "user1@email.com", "password")))
            .unwrap();

        assert_eq!(user.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(user.header_image_url, DEFAULT_HEADER_IMAGE_URL);
    }

    #[test]
    fn password_is_stored_hashed() {
        let db = test_db();
        let store = IdentityStore::default(); // real Argon2id
        let user = db
            .transaction(|tx| store.signup(tx, NewUser::new("user1", "user1@email.com", "password")))
            .unwrap();

        assert_ne!(user.password, "password");
        assert!(user.password.starts_with("$argon2id$"));
    }

    #[test]
    fn update_profile_requires_matching_password() {
        let db = test_db();
        let store = store();
        let user = signup_sample(&db, &store, "user1");

        let update = ProfileUpdate {
            username: Some("updateduser".into()),
            ..ProfileUpdate::default()
        };
        let err = db
            .transaction(|tx| store.update_profile(tx, user.id, update, "wrong"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Authorization(_)));

        // unchanged
        let still = db.transaction(|tx| store.get_user(tx, user.id)).unwrap().unwrap();
        assert_eq!(still.username, "user1");
    }

    #[test]
    fn update_profile_applies_changed_fields() {
        let db = test_db();
        let store = store();
        let user = signup_sample(&db, &store, "user1");

        let update = ProfileUpdate {
            username: Some("updateduser".into()),
            email: Some("updated@email.com".into()),
            bio: Some("hello".into()),
            ..ProfileUpdate::default()
        };
        let updated = db
            .transaction(|tx| store.update_profile(tx, user.id, update, "password"))
            .unwrap();

        assert_eq!(updated.username, "updateduser");
        assert_eq!(updated.email, "updated@email.com");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        // untouched fields survive
        assert_eq!(updated.image_url, user.image_url);
    }

    #[test]
    fn update_profile_rejects_taken_username() {
        let db = test_db();
        let store = store();
        let _user1 = signup_sample(&db, &store, "user1");
        let user2 = signup_sample(&db, &store, "user2");

        let update = ProfileUpdate {
            username: Some("user1".into()),
            ..ProfileUpdate::default()
        };
        let err = db
            .transaction(|tx| store.update_profile(tx, user2.id, update, "password"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn list_users_filters_by_username_substring() {
        let db = test_db();
        let store = store();
        signup_sample(&db, &store, "testuser");
        signup_sample(&db, &store, "searcheduser");

        let all = db.transaction(|tx| store.list_users(tx, None)).unwrap();
        assert_eq!(all.len(), 2);

        let found = db
            .transaction(|tx| store.list_users(tx, Some("searched")))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "searcheduser");
    }

    #[test]
    fn diagnostic_form_matches_row_identity() {
        let db = test_db();
        let store = store();
        signup_sample(&db, &store, "user1");
        signup_sample(&db, &store, "user2");
        let u = db
            .transaction(|tx| {
                store.signup(tx, NewUser::new("testuser", "test@test.com", "password"))
            })
            .unwrap();

        assert_eq!(u.to_string(), "<User #3: testuser, test@test.com>");
    }
}
