//! Persistence layer for the laundry tracker
//!
//! Provides:
//! - The shared `machines` table (one row per machine)
//! - A polled change feed emitting `{new, old}` row pairs
//! - The local identity file

mod feed;
mod identity;
mod sqlite;
mod traits;

pub use feed::*;
pub use identity::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Write conflict on {machine_type}: row is no longer {expected}")]
    Conflict {
        machine_type: String,
        expected: String,
    },

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
