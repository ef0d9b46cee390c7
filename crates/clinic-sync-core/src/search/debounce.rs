//! Trailing-edge debounce.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Monotonic tag attached to each committed query. Responses carrying a
/// token older than the latest are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(pub u64);

/// Hands out increasing [`RequestToken`]s.
#[derive(Debug, Default)]
pub(crate) struct TokenSource(AtomicU64);

impl TokenSource {
    pub(crate) fn next(&self) -> RequestToken {
        RequestToken(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Where a debounced input is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DebouncePhase {
    /// Nothing typed and nothing committed yet.
    Idle,
    /// Input changed; waiting for the quiet period.
    Pending,
    /// Last commit went out with this token.
    Committed(RequestToken),
}

/// Runs a commit once input has been quiet for `delay`.
///
/// Every [`Debouncer::schedule`] call cancels the previous timer. The commit
/// itself runs on its own task, so an in-flight request is never aborted by a
/// later keystroke; staleness is handled by the caller's tokens.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the timer; `commit` runs when it expires.
    pub fn schedule<F>(&self, commit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(commit);
        });
        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Cancel a pending timer. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(timer) => {
                let was_pending = !timer.is_finished();
                timer.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}
