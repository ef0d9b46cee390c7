//! SQLite-backed remote store.
//!
//! [`SqliteBackend`] owns the database and the change feed shared by every
//! session; [`SqliteStore`] is one session's handle onto it and stamps its
//! mutations with that session's actor id.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::{
    ChangeEvent, ChangeKind, ChangeStream, Collection, Page, Query, RemoteStore, Row, StoreError,
    StoreResult,
};
use crate::db::{table_for, Database, DbError};
use crate::models::{ActorId, RecordId};

/// Shared database plus the broadcast change feed.
pub struct SqliteBackend {
    db: Mutex<Database>,
    events: broadcast::Sender<ChangeEvent>,
}

impl SqliteBackend {
    /// Open (or create) a database file.
    pub fn open<P: AsRef<Path>>(path: P, event_buffer: usize) -> StoreResult<Arc<Self>> {
        Ok(Self::from_database(Database::open(path)?, event_buffer))
    }

    /// In-memory database (for testing).
    pub fn open_in_memory(event_buffer: usize) -> StoreResult<Arc<Self>> {
        Ok(Self::from_database(Database::open_in_memory()?, event_buffer))
    }

    pub fn from_database(db: Database, event_buffer: usize) -> Arc<Self> {
        let (events, _rx) = broadcast::channel(event_buffer.max(1));
        Arc::new(Self {
            db: Mutex::new(db),
            events,
        })
    }

    /// Open a session handle attributed to `actor`.
    pub fn session(self: &Arc<Self>, actor: ActorId) -> SqliteStore {
        SqliteStore {
            backend: Arc::clone(self),
            actor,
        }
    }

    fn publish(&self, collection: Collection, kind: ChangeKind, record_id: RecordId, record: Option<Row>, actor: ActorId) {
        debug!(%collection, ?kind, record_id, %actor, "publishing change");
        // No receivers is fine; nobody is listening.
        let _ = self.events.send(ChangeEvent {
            collection,
            kind,
            record_id,
            record,
            actor,
            at: chrono::Utc::now().to_rfc3339(),
        });
    }
}

/// One session's view of the shared store.
#[derive(Clone)]
pub struct SqliteStore {
    backend: Arc<SqliteBackend>,
    actor: ActorId,
}

fn row_id(row: &Row) -> RecordId {
    row.get("id").and_then(Value::as_i64).unwrap_or_default()
}

fn write_error(err: DbError) -> StoreError {
    match err {
        DbError::Constraint(message) => StoreError::Rejected(message),
        err @ (DbError::UnknownField { .. } | DbError::InvalidValue { .. }) => {
            StoreError::Rejected(err.to_string())
        }
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    fn actor(&self) -> ActorId {
        self.actor
    }

    async fn query(&self, collection: Collection, query: &Query) -> StoreResult<Page> {
        let spec = table_for(collection);
        let (rows, total_count) = self
            .backend
            .db
            .lock()
            .query_rows(spec, query)
            .map_err(write_error)?;
        Ok(Page { rows, total_count })
    }

    async fn insert(&self, collection: Collection, row: Row) -> StoreResult<Row> {
        let stored = self
            .backend
            .db
            .lock()
            .insert_row(table_for(collection), &row)
            .map_err(write_error)?;

        self.backend.publish(
            collection,
            ChangeKind::Insert,
            row_id(&stored),
            Some(stored.clone()),
            self.actor,
        );
        Ok(stored)
    }

    async fn update(&self, collection: Collection, id: RecordId, patch: Row) -> StoreResult<Row> {
        let stored = self
            .backend
            .db
            .lock()
            .update_row(table_for(collection), id, &patch)
            .map_err(write_error)?
            .ok_or(StoreError::NotFound { collection, id })?;

        self.backend.publish(
            collection,
            ChangeKind::Update,
            id,
            Some(stored.clone()),
            self.actor,
        );
        Ok(stored)
    }

    async fn delete(&self, collection: Collection, id: RecordId) -> StoreResult<()> {
        let deleted = self
            .backend
            .db
            .lock()
            .delete_row(table_for(collection), id)
            .map_err(|err| match err {
                DbError::Constraint(detail) => StoreError::InUse {
                    collection,
                    id,
                    detail,
                },
                other => write_error(other),
            })?;
        if !deleted {
            return Err(StoreError::NotFound { collection, id });
        }

        self.backend
            .publish(collection, ChangeKind::Delete, id, None, self.actor);
        Ok(())
    }

    async fn subscribe(&self, collection: Collection, kind: ChangeKind) -> StoreResult<ChangeStream> {
        let rx = self.backend.events.subscribe();
        let stream = futures::stream::unfold(rx, move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.collection == collection && event.kind == kind => {
                        return Some((event, rx));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%collection, ?kind, skipped, "change feed lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
