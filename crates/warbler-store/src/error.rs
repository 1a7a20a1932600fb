use thiserror::Error;

/// Error surface of the three stores. Every variant is recoverable at the
/// handler boundary; bad credentials are NOT an error (see
/// `IdentityStore::authenticate`).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad or duplicate input, surfaced to the caller as a field-level message.
    #[error("{0}")]
    Validation(String),

    /// The acting user lacks rights over the target entity.
    #[error("{0}")]
    Authorization(String),

    /// Uniqueness or state conflict, e.g. a double-follow losing a race.
    #[error("{0}")]
    Conflict(String),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error("internal: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        StoreError::Authorization(msg.into())
    }

    /// Translate a storage-level constraint violation into a domain
    /// `Conflict` instead of leaking the raw SQLite error. Unique-constraint
    /// races between concurrent requests end up here.
    pub fn constraint(err: rusqlite::Error, conflict: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(conflict.to_string())
            }
            other => StoreError::Storage(other),
        }
    }
}
