//! Directed follow edges between users. Stateless: every operation takes the
//! caller's transaction.

use rusqlite::{OptionalExtension, Transaction, params};

use warbler_types::models::User;

use crate::error::StoreError;
use crate::identity::{map_user, user_exists};

/// Insert the edge follower → followee. Following yourself is rejected, and
/// following someone twice is a conflict (the composite primary key decides,
/// so concurrent double-follows resolve the same way).
pub fn follow(tx: &Transaction<'_>, follower_id: i64, followee_id: i64) -> Result<(), StoreError> {
    if follower_id == followee_id {
        return Err(StoreError::validation("cannot follow yourself"));
    }
    if !user_exists(tx, follower_id)? || !user_exists(tx, followee_id)? {
        return Err(StoreError::NotFound("user"));
    }

    tx.execute(
        "INSERT INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
        params![followee_id, follower_id],
    )
    .map_err(|e| StoreError::constraint(e, "already following this user"))?;

    Ok(())
}

/// Remove the edge if present; absent edges are a no-op.
pub fn unfollow(
    tx: &Transaction<'_>,
    follower_id: i64,
    followee_id: i64,
) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
        params![followee_id, follower_id],
    )?;
    Ok(())
}

pub fn is_following(
    tx: &Transaction<'_>,
    follower_id: i64,
    followee_id: i64,
) -> Result<bool, StoreError> {
    let hit = tx
        .query_row(
            "SELECT 1 FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
            params![followee_id, follower_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// `is_followed_by(a, b)` == `is_following(b, a)` by definition.
pub fn is_followed_by(
    tx: &Transaction<'_>,
    user_id: i64,
    other_id: i64,
) -> Result<bool, StoreError> {
    is_following(tx, other_id, user_id)
}

/// Users that `user_id` follows, in the order the edges were created.
pub fn following_of(tx: &Transaction<'_>, user_id: i64) -> Result<Vec<User>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT u.id, u.username, u.email, u.password, u.image_url, u.header_image_url,
                u.bio, u.location, u.created_at
         FROM follows f
         JOIN users u ON u.id = f.user_being_followed_id
         WHERE f.user_following_id = ?1
         ORDER BY f.rowid",
    )?;
    let rows = stmt
        .query_map([user_id], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(User::from).collect())
}

/// Users following `user_id`, in the order the edges were created.
pub fn followers_of(tx: &Transaction<'_>, user_id: i64) -> Result<Vec<User>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT u.id, u.username, u.email, u.password, u.image_url, u.header_image_url,
                u.bio, u.location, u.created_at
         FROM follows f
         JOIN users u ON u.id = f.user_following_id
         WHERE f.user_being_followed_id = ?1
         ORDER BY f.rowid",
    )?;
    let rows = stmt
        .query_map([user_id], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(User::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{signup_sample, store, test_db};

    #[test]
    fn follow_sets_both_directional_views() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");
        let u2 = signup_sample(&db, &store, "user2");

        db.transaction(|tx| follow(tx, u1.id, u2.id)).unwrap();

        db.transaction(|tx| {
            assert!(is_following(tx, u1.id, u2.id)?);
            assert!(!is_following(tx, u2.id, u1.id)?);
            assert!(is_followed_by(tx, u2.id, u1.id)?);
            assert!(!is_followed_by(tx, u1.id, u2.id)?);
            Ok::<_, StoreError>(())
        })
        .unwrap();
    }

    #[test]
    fn unfollow_clears_both_directional_views() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");
        let u2 = signup_sample(&db, &store, "user2");

        db.transaction(|tx| follow(tx, u1.id, u2.id)).unwrap();
        db.transaction(|tx| unfollow(tx, u1.id, u2.id)).unwrap();

        db.transaction(|tx| {
            assert!(!is_following(tx, u1.id, u2.id)?);
            assert!(!is_followed_by(tx, u2.id, u1.id)?);
            Ok::<_, StoreError>(())
        })
        .unwrap();
    }

    #[test]
    fn unfollow_missing_edge_is_noop() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");
        let u2 = signup_sample(&db, &store, "user2");

        db.transaction(|tx| unfollow(tx, u1.id, u2.id)).unwrap();
    }

    #[test]
    fn double_follow_is_conflict() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");
        let u2 = signup_sample(&db, &store, "user2");

        db.transaction(|tx| follow(tx, u1.id, u2.id)).unwrap();
        let err = db.transaction(|tx| follow(tx, u1.id, u2.id)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn self_follow_is_rejected() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");

        let err = db.transaction(|tx| follow(tx, u1.id, u1.id)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(!db.transaction(|tx| is_following(tx, u1.id, u1.id)).unwrap());
    }

    #[test]
    fn follow_unknown_user_is_not_found() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");

        let err = db.transaction(|tx| follow(tx, u1.id, 999)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn new_user_has_empty_listings() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");

        assert!(db.transaction(|tx| followers_of(tx, u1.id)).unwrap().is_empty());
        assert!(db.transaction(|tx| following_of(tx, u1.id)).unwrap().is_empty());
    }

    #[test]
    fn listings_preserve_insertion_order() {
        let db = test_db();
        let store = store();
        let u1 = signup_sample(&db, &store, "user1");
        let u2 = signup_sample(&db, &store, "user2");
        let u3 = signup_sample(&db, &store, "user3");

        db.transaction(|tx| {
            follow(tx, u1.id, u3.id)?;
            follow(tx, u1.id, u2.id)?;
            follow(tx, u2.id, u3.id)
        })
        .unwrap();

        let following = db.transaction(|tx| following_of(tx, u1.id)).unwrap();
        let names: Vec<&str> = following.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["user3", "user2"]);

        let followers = db.transaction(|tx| followers_of(tx, u3.id)).unwrap();
        let names: Vec<&str> = followers.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["user1", "user2"]);
    }
}
