//! Remote store contract.
//!
//! The backing data service is a black box offering filtered/paginated
//! queries, single-row mutations and a push feed of change events keyed by
//! collection. [`RemoteStore`] is the seam; [`sqlite::SqliteStore`] is the
//! bundled implementation.

mod query;
pub mod sqlite;

pub use query::*;
pub use sqlite::{SqliteBackend, SqliteStore};

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ActorId, RecordId};

/// A row as it crosses the store boundary.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Server-side collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Doctors,
    Patients,
    Practices,
    SocialWorks,
    SocialWorkPlans,
    Prescriptions,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Doctors,
        Collection::Patients,
        Collection::Practices,
        Collection::SocialWorks,
        Collection::SocialWorkPlans,
        Collection::Prescriptions,
    ];

    /// Table name in the backing store.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Doctors => "doctors",
            Collection::Patients => "patients",
            Collection::Practices => "practices",
            Collection::SocialWorks => "social_works",
            Collection::SocialWorkPlans => "social_work_plans",
            Collection::Prescriptions => "prescriptions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Kind of change carried by a realtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A server-pushed change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub record_id: RecordId,
    /// Row after the change; `None` for deletes
    pub record: Option<Row>,
    /// Session that caused the change
    pub actor: ActorId,
    /// RFC 3339 timestamp
    pub at: String,
}

/// Stream of change events for one subscription. Dropping it unsubscribes.
pub type ChangeStream = BoxStream<'static, ChangeEvent>;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{collection} #{id} not found")]
    NotFound { collection: Collection, id: RecordId },

    /// Delete rejected because other records still reference the row.
    #[error("{collection} #{id} is still referenced: {detail}")]
    InUse {
        collection: Collection,
        id: RecordId,
        detail: String,
    },

    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

impl StoreError {
    /// True when a delete failed on referential constraints.
    pub fn is_in_use(&self) -> bool {
        matches!(self, StoreError::InUse { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote data service as seen by the synchronization layer.
///
/// Implementations attribute every mutation to the session they were opened
/// for; the resulting change events carry that session's [`ActorId`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Actor this handle stamps on every mutation.
    fn actor(&self) -> ActorId;

    /// Run a filtered, ordered, ranged query and return the exact total count.
    async fn query(&self, collection: Collection, query: &Query) -> StoreResult<Page>;

    /// Insert a row; returns the canonical stored row (with `id`).
    async fn insert(&self, collection: Collection, row: Row) -> StoreResult<Row>;

    /// Apply a partial update; returns the canonical stored row.
    async fn update(&self, collection: Collection, id: RecordId, patch: Row) -> StoreResult<Row>;

    async fn delete(&self, collection: Collection, id: RecordId) -> StoreResult<()>;

    /// Open a change feed for one collection and event kind.
    async fn subscribe(&self, collection: Collection, kind: ChangeKind) -> StoreResult<ChangeStream>;
}
