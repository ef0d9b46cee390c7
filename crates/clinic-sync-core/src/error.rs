//! Errors surfaced to UI callers by user-initiated writes.

use thiserror::Error;

use crate::store::{Collection, StoreError};

/// Synchronization layer errors.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store returned a row the client cannot decode.
    #[error("Malformed {collection} row: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SyncError {
    /// True when a delete was refused because the record is still referenced,
    /// e.g. a doctor with prescriptions.
    pub fn is_in_use(&self) -> bool {
        matches!(self, SyncError::Store(err) if err.is_in_use())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
