//! Messages and likes. Stateless: every operation takes the caller's
//! transaction.

use rusqlite::{OptionalExtension, Row, Transaction, params};

use warbler_db::rows::MessageRow;
use warbler_types::models::Message;

use crate::error::StoreError;
use crate::identity::user_exists;

pub const MAX_MESSAGE_LEN: usize = 140;

/// Default page size of the home feed.
pub const FEED_LIMIT: u32 = 100;

pub fn post_message(
    tx: &Transaction<'_>,
    author_id: i64,
    text: &str,
) -> Result<Message, StoreError> {
    if text.is_empty() {
        return Err(StoreError::validation("text must not be empty"));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(StoreError::validation(format!(
            "text must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    if !user_exists(tx, author_id)? {
        return Err(StoreError::NotFound("user"));
    }

    tx.execute(
        "INSERT INTO messages (text, user_id) VALUES (?1, ?2)",
        params![text, author_id],
    )?;

    let id = tx.last_insert_rowid();
    get_message(tx, id)?.ok_or(StoreError::NotFound("message"))
}

pub fn get_message(tx: &Transaction<'_>, id: i64) -> Result<Option<Message>, StoreError> {
    let row = tx
        .query_row(
            "SELECT id, text, user_id, created_at FROM messages WHERE id = ?1",
            [id],
            map_message,
        )
        .optional()?;
    Ok(row.map(Message::from))
}

/// Only the author may delete; the message's likes go with it.
pub fn delete_message(
    tx: &Transaction<'_>,
    message_id: i64,
    requester_id: i64,
) -> Result<(), StoreError> {
    let message = get_message(tx, message_id)?.ok_or(StoreError::NotFound("message"))?;

    if message.user_id != requester_id {
        return Err(StoreError::authorization(
            "only the author may delete a message",
        ));
    }

    tx.execute("DELETE FROM likes WHERE message_id = ?1", [message_id])?;
    tx.execute("DELETE FROM messages WHERE id = ?1", [message_id])?;
    Ok(())
}

/// The author's messages, newest first.
pub fn messages_of(tx: &Transaction<'_>, user_id: i64) -> Result<Vec<Message>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT id, text, user_id, created_at
         FROM messages
         WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([user_id], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(Message::from).collect())
}

/// Latest messages by `user_id` and the users they follow, newest first.
pub fn feed_of(tx: &Transaction<'_>, user_id: i64, limit: u32) -> Result<Vec<Message>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT m.id, m.text, m.user_id, m.created_at
         FROM messages m
         WHERE m.user_id = ?1
            OR m.user_id IN (SELECT user_being_followed_id FROM follows
                             WHERE user_following_id = ?1)
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![user_id, limit], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(Message::from).collect())
}

/// Endorse someone else's message. Liking twice is a no-op; liking your own
/// message is rejected.
pub fn like(tx: &Transaction<'_>, user_id: i64, message_id: i64) -> Result<(), StoreError> {
    let message = get_message(tx, message_id)?.ok_or(StoreError::NotFound("message"))?;

    if message.user_id == user_id {
        return Err(StoreError::validation("cannot like your own message"));
    }
    if !user_exists(tx, user_id)? {
        return Err(StoreError::NotFound("user"));
    }

    tx.execute(
        "INSERT OR IGNORE INTO likes (user_id, message_id) VALUES (?1, ?2)",
        params![user_id, message_id],
    )?;
    Ok(())
}

/// Remove the like if present; absent likes are a no-op.
pub fn unlike(tx: &Transaction<'_>, user_id: i64, message_id: i64) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
        params![user_id, message_id],
    )?;
    Ok(())
}

/// Messages `user_id` has liked, in the order the likes were given.
pub fn likes_of(tx: &Transaction<'_>, user_id: i64) -> Result<Vec<Message>, StoreError> {
    let mut stmt = tx.prepare(
        "SELECT m.id, m.text, m.user_id, m.created_at
         FROM likes l
         JOIN messages m ON m.id = l.message_id
         WHERE l.user_id = ?1
         ORDER BY l.rowid",
    )?;
    let rows = stmt
        .query_map([user_id], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(Message::from).collect())
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}
