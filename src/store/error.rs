use thiserror::Error;
use uuid::Uuid;

/// Result type for chat store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error types for chat store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The chat document doesn't exist
    #[error("Chat not found: {0}")]
    NotFound(Uuid),

    /// Concurrency error - the document changed since it was loaded
    #[error("Concurrency error on chat '{chat_id}': expected version {expected_version}")]
    Concurrency { chat_id: Uuid, expected_version: i64 },

    /// Validation error - invalid input data
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection error - database unreachable or authentication failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database error - SQL errors, constraint violations
    #[error("Database error: {0}")]
    Database(String),

    /// Pool error - connection pool issues
    #[error("Pool error: {0}")]
    Pool(String),

    /// A stored document couldn't be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_error) = err.as_db_error() {
            return StoreError::Database(format!(
                "{}: {}",
                db_error.code().code(),
                db_error.message()
            ));
        }

        StoreError::Database(format!("{:?}", err))
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<deadpool_postgres::BuildError> for StoreError {
    fn from(err: deadpool_postgres::BuildError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
