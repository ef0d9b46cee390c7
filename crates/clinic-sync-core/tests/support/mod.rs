//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use clinic_sync_core::models::{ActorId, RecordId};
use clinic_sync_core::SyncConfig;
use clinic_sync_core::store::{
    ChangeKind, ChangeStream, Collection, Page, Query, RemoteStore, Row, SqliteBackend,
    SqliteStore, StoreError, StoreResult,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::oneshot;

pub fn init_logging() {
    clinic_sync_core::logging::init_logging("clinic_sync_core=debug");
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Wraps a session store, counting queries and letting tests inject
/// failures or hold queries in flight.
pub struct InstrumentedStore {
    inner: SqliteStore,
    queries: Mutex<Vec<(Collection, Query)>>,
    fail_queries: AtomicBool,
    fail_subscribe: AtomicBool,
    holding: AtomicBool,
    holding_subscribes: AtomicBool,
    held: Mutex<Vec<oneshot::Sender<()>>>,
}

impl InstrumentedStore {
    pub fn new(inner: SqliteStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            queries: Mutex::new(Vec::new()),
            fail_queries: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            holding: AtomicBool::new(false),
            holding_subscribes: AtomicBool::new(false),
            held: Mutex::new(Vec::new()),
        })
    }

    pub fn query_count(&self, collection: Collection) -> usize {
        self.queries
            .lock()
            .iter()
            .filter(|(c, _)| *c == collection)
            .count()
    }

    pub fn queries(&self, collection: Collection) -> Vec<Query> {
        self.queries
            .lock()
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, q)| q.clone())
            .collect()
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// From now on, queries wait until released.
    pub fn hold_queries(&self, hold: bool) {
        self.holding.store(hold, Ordering::SeqCst);
    }

    /// From now on, subscribe calls wait until released. They share the
    /// release queue with held queries.
    pub fn hold_subscribes(&self, hold: bool) {
        self.holding_subscribes.store(hold, Ordering::SeqCst);
    }

    async fn wait_if(&self, flag: &AtomicBool) {
        if flag.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.held.lock().push(tx);
            let _ = rx.await;
        }
    }

    pub fn held(&self) -> usize {
        self.held.lock().len()
    }

    /// Release the `index`-th held query (in arrival order).
    pub fn release(&self, index: usize) {
        let tx = self.held.lock().remove(index);
        let _ = tx.send(());
    }

    pub fn release_all(&self) {
        for tx in self.held.lock().drain(..) {
            let _ = tx.send(());
        }
    }
}

#[async_trait]
impl RemoteStore for InstrumentedStore {
    fn actor(&self) -> ActorId {
        self.inner.actor()
    }

    async fn query(&self, collection: Collection, query: &Query) -> StoreResult<Page> {
        self.queries.lock().push((collection, query.clone()));

        self.wait_if(&self.holding).await;
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("network unreachable".into()));
        }
        self.inner.query(collection, query).await
    }

    async fn insert(&self, collection: Collection, row: Row) -> StoreResult<Row> {
        self.inner.insert(collection, row).await
    }

    async fn update(&self, collection: Collection, id: RecordId, patch: Row) -> StoreResult<Row> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: Collection, id: RecordId) -> StoreResult<()> {
        self.inner.delete(collection, id).await
    }

    async fn subscribe(&self, collection: Collection, kind: ChangeKind) -> StoreResult<ChangeStream> {
        self.wait_if(&self.holding_subscribes).await;
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("realtime disabled".into()));
        }
        self.inner.subscribe(collection, kind).await
    }
}

/// Backend plus an instrumented session on it.
pub fn instrumented() -> (Arc<SqliteBackend>, Arc<InstrumentedStore>) {
    init_logging();
    let backend = SqliteBackend::open_in_memory(SyncConfig::default().event_buffer).unwrap();
    let store = InstrumentedStore::new(backend.session(ActorId::new()));
    (backend, store)
}

pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

/// Insert `n` patients named `Patient{i:03}` directly through the backend.
pub async fn seed_patients(store: &SqliteStore, n: usize) {
    for i in 0..n {
        store
            .insert(
                Collection::Patients,
                row(json!({
                    "first_name": "Test",
                    "last_name": format!("Patient{i:03}"),
                    "document_number": format!("{}", 20_000_000 + i),
                })),
            )
            .await
            .unwrap();
    }
}

pub async fn seed_doctor(store: &SqliteStore, last_name: &str) -> RecordId {
    let stored = store
        .insert(
            Collection::Doctors,
            row(json!({"first_name": "Dr", "last_name": last_name, "license_number": "MN-1"})),
        )
        .await
        .unwrap();
    stored["id"].as_i64().unwrap()
}
