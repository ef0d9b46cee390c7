//! Realtime notices about changes made by other users.
//!
//! The center opens one change feed per [`NotificationCategory`] for the
//! active session and raises the matching flag whenever an event arrives
//! from a different actor. Events caused by the session itself (another tab,
//! or the cache's own writes) are ignored. Clinicians get no feeds at all.
//! The center never touches the cached collections; reloading is always the
//! user's call.

mod flags;

pub use flags::{NotificationCategory, NotificationFlags};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{ActorId, Session};
use crate::store::{ChangeStream, RemoteStore};

/// Identifies one `start` call; stale handles cannot stop a newer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Feed tasks that are aborted when the set is dropped, including when a
/// `start` future is cancelled between subscriptions.
#[derive(Default)]
struct FeedSet(Vec<JoinHandle<()>>);

impl FeedSet {
    fn running(&self) -> usize {
        self.0.iter().filter(|feed| !feed.is_finished()).count()
    }
}

impl Drop for FeedSet {
    fn drop(&mut self) {
        for feed in &self.0 {
            feed.abort();
        }
    }
}

struct Active {
    handle: SubscriptionHandle,
    feeds: FeedSet,
}

/// Subscription manager and flag store.
pub struct NotificationCenter {
    store: Arc<dyn RemoteStore>,
    flags: Arc<watch::Sender<NotificationFlags>>,
    active: Mutex<Option<Active>>,
    next_handle: AtomicU64,
}

impl NotificationCenter {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let (flags, _rx) = watch::channel(NotificationFlags::default());
        Self {
            store,
            flags: Arc::new(flags),
            active: Mutex::new(None),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Open feeds for `session`, closing any previous ones first.
    ///
    /// Own changes are recognized by the actor the store stamps on writes,
    /// not by `session.actor`. A feed that fails to open is logged and
    /// skipped; the rest still work.
    pub async fn start(&self, session: &Session) -> SubscriptionHandle {
        self.stop_all();
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let own_actor = self.store.actor();
        if session.actor != own_actor {
            warn!(session = %session.actor, store = %own_actor, "session actor differs from store actor");
        }

        let mut feeds = FeedSet::default();
        if session.role.receives_notifications() {
            for category in NotificationCategory::ALL {
                let (collection, kind) = category.watched();
                match self.store.subscribe(collection, kind).await {
                    Ok(stream) => feeds.0.push(tokio::spawn(watch_feed(
                        stream,
                        category,
                        own_actor,
                        Arc::clone(&self.flags),
                    ))),
                    Err(err) => {
                        warn!(%collection, ?kind, error = %err, "change feed unavailable");
                    }
                }
            }
            info!(user = %session.user_name, feeds = feeds.0.len(), "notifications started");
        } else {
            info!(user = %session.user_name, role = ?session.role, "notifications disabled for role");
        }

        // A concurrent start may have finished first; keep only the newest.
        let previous = self.active.lock().replace(Active { handle, feeds });
        drop(previous);
        handle
    }

    /// Close the feeds opened by `handle`. Returns false for a stale handle.
    pub fn stop(&self, handle: SubscriptionHandle) -> bool {
        let mut active = self.active.lock();
        if active.as_ref().map(|a| a.handle) != Some(handle) {
            return false;
        }
        active.take();
        debug!(?handle, "notifications stopped");
        true
    }

    /// Close whatever feeds are open.
    pub fn stop_all(&self) {
        let current = self.active.lock().take();
        drop(current);
    }

    /// Number of open change feeds.
    pub fn active_feeds(&self) -> usize {
        self.active
            .lock()
            .as_ref()
            .map(|a| a.feeds.running())
            .unwrap_or(0)
    }

    pub fn flags(&self) -> NotificationFlags {
        *self.flags.borrow()
    }

    /// Receiver that wakes whenever a flag changes.
    pub fn watch_flags(&self) -> watch::Receiver<NotificationFlags> {
        self.flags.subscribe()
    }

    pub fn has_any_notification(&self) -> bool {
        self.flags.borrow().any()
    }

    pub fn is_set(&self, category: NotificationCategory) -> bool {
        self.flags.borrow().get(category)
    }

    /// Reset every flag; called together with a data refresh.
    pub fn clear_notifications(&self) {
        self.flags.send_if_modified(|flags| {
            let changed = flags.any();
            *flags = NotificationFlags::default();
            changed
        });
    }

    /// Dismiss a single category.
    pub fn clear_specific_notification(&self, category: NotificationCategory) {
        self.flags.send_if_modified(|flags| {
            let changed = flags.get(category);
            flags.set(category, false);
            changed
        });
    }
}

async fn watch_feed(
    mut stream: ChangeStream,
    category: NotificationCategory,
    own_actor: ActorId,
    flags: Arc<watch::Sender<NotificationFlags>>,
) {
    while let Some(event) = stream.next().await {
        if event.actor == own_actor {
            debug!(?category, record_id = event.record_id, "ignoring own change");
            continue;
        }
        debug!(?category, record_id = event.record_id, actor = %event.actor, "foreign change");
        flags.send_if_modified(|flags| {
            let was_set = flags.get(category);
            flags.set(category, true);
            !was_set
        });
    }
    debug!(?category, "change feed closed");
}
