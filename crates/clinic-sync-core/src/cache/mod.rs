//! Lazy, single-flight cache of server-backed collections.
//!
//! Each [`CollectionCache`] holds one collection in memory. It is fetched at
//! most once until invalidated; writes go to the store first and the
//! canonical row the store returns is applied locally.
//!
//! Loads and writes on the same collection are serialized through a
//! per-collection operation lock, so a delete can never be undone by a load
//! response that was already in flight. Different collections never wait on
//! each other.

mod codec;

pub(crate) use codec::{decode_row, encode_row};

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::models::{Entity, RecordId};
use crate::store::{Collection, Query, RemoteStore};

/// Load lifecycle of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Never requested, or invalidated.
    NotLoaded,
    Loading,
    /// Fetched; the collection may legitimately be empty.
    Loaded,
    /// Last fetch failed. The next `load()` retries.
    Failed(String),
}

struct Slice<T> {
    items: Vec<T>,
    state: LoadState,
    /// Bumped on invalidation so superseded loads don't populate.
    epoch: u64,
}

/// Resets a load whose future was dropped before it finished, so the next
/// `load()` fetches again instead of hitting the `Loading` guard.
struct AbandonedLoad<'a, T> {
    slice: &'a Mutex<Slice<T>>,
    epoch: u64,
    armed: bool,
}

impl<T> Drop for AbandonedLoad<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slice = self.slice.lock();
        if slice.epoch == self.epoch && slice.state == LoadState::Loading {
            debug!("load dropped before completion");
            slice.state = LoadState::NotLoaded;
        }
    }
}

/// In-memory copy of one collection.
pub struct CollectionCache<T: Entity> {
    store: Arc<dyn RemoteStore>,
    slice: Mutex<Slice<T>>,
    ops: tokio::sync::Mutex<()>,
}

impl<T: Entity> CollectionCache<T> {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            slice: Mutex::new(Slice {
                items: Vec::new(),
                state: LoadState::NotLoaded,
                epoch: 0,
            }),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    pub fn collection(&self) -> Collection {
        T::COLLECTION
    }

    /// Snapshot of the cached records.
    pub fn items(&self) -> Vec<T> {
        self.slice.lock().items.clone()
    }

    pub fn get(&self, id: RecordId) -> Option<T> {
        self.slice
            .lock()
            .items
            .iter()
            .find(|item| item.id() == Some(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.slice.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load_state(&self) -> LoadState {
        self.slice.lock().state.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.load_state() == LoadState::Loading
    }

    /// Fetch the whole collection unless it is already loading or loaded.
    ///
    /// Failures are logged and leave the collection empty in
    /// [`LoadState::Failed`]; nothing is returned to the caller.
    pub async fn load(&self) {
        let collection = T::COLLECTION;
        let epoch = {
            let mut slice = self.slice.lock();
            if matches!(slice.state, LoadState::Loading | LoadState::Loaded) {
                debug!(%collection, state = ?slice.state, "load skipped");
                return;
            }
            slice.state = LoadState::Loading;
            slice.epoch
        };
        let mut abandoned = AbandonedLoad {
            slice: &self.slice,
            epoch,
            armed: true,
        };

        let _op = self.ops.lock().await;
        let result = self.fetch_all().await;
        abandoned.armed = false;

        let mut slice = self.slice.lock();
        if slice.epoch != epoch {
            debug!(%collection, "discarding superseded load");
            return;
        }
        match result {
            Ok(items) => {
                info!(%collection, count = items.len(), "collection loaded");
                slice.items = items;
                slice.state = LoadState::Loaded;
            }
            Err(err) => {
                warn!(%collection, error = %err, "collection load failed");
                slice.items.clear();
                slice.state = LoadState::Failed(err.to_string());
            }
        }
    }

    /// Drop the cached copy and fetch again, bypassing the once-only guard.
    ///
    /// Collections that were never loaded are left alone.
    pub async fn invalidate_and_reload(&self) {
        {
            let mut slice = self.slice.lock();
            if slice.state == LoadState::NotLoaded {
                debug!(collection = %T::COLLECTION, "reload skipped, never loaded");
                return;
            }
            slice.items.clear();
            slice.state = LoadState::NotLoaded;
            slice.epoch += 1;
        }
        self.load().await;
    }

    /// Insert through the store and append the canonical record.
    pub async fn create(&self, record: &T) -> SyncResult<T> {
        let row = encode_row(T::COLLECTION, record)?;

        let _op = self.ops.lock().await;
        let stored: T = decode_row(T::COLLECTION, self.store.insert(T::COLLECTION, row).await?)?;

        let mut slice = self.slice.lock();
        if let Some(id) = stored.id() {
            slice.items.retain(|item| item.id() != Some(id));
        }
        slice.items.push(stored.clone());
        debug!(collection = %T::COLLECTION, id = ?stored.id(), "record created");
        Ok(stored)
    }

    /// Apply a partial update (any serializable map of fields) and replace the
    /// cached record.
    pub async fn update<P: Serialize + Sync>(&self, id: RecordId, patch: &P) -> SyncResult<T> {
        let patch = encode_row(T::COLLECTION, patch)?;

        let _op = self.ops.lock().await;
        let stored: T =
            decode_row(T::COLLECTION, self.store.update(T::COLLECTION, id, patch).await?)?;

        let mut slice = self.slice.lock();
        if let Some(slot) = slice.items.iter_mut().find(|item| item.id() == Some(id)) {
            *slot = stored.clone();
        }
        debug!(collection = %T::COLLECTION, id, "record updated");
        Ok(stored)
    }

    /// Delete through the store, then drop the cached record.
    ///
    /// A referential-integrity refusal comes back as an error for which
    /// [`crate::SyncError::is_in_use`] is true.
    pub async fn delete(&self, id: RecordId) -> SyncResult<()> {
        let _op = self.ops.lock().await;
        self.store.delete(T::COLLECTION, id).await?;

        self.slice
            .lock()
            .items
            .retain(|item| item.id() != Some(id));
        debug!(collection = %T::COLLECTION, id, "record deleted");
        Ok(())
    }

    async fn fetch_all(&self) -> SyncResult<Vec<T>> {
        let page = self.store.query(T::COLLECTION, &Query::all()).await?;
        page.rows
            .into_iter()
            .map(|row| decode_row(T::COLLECTION, row))
            .collect()
    }
}
