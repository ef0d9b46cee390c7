//! Paginated, debounced patient search.
//!
//! Typing updates the input immediately; the input is applied to the query
//! only after [`SyncConfig::filter_debounce`] of quiet, and a query is
//! committed only when the applied input actually changed. Every committed
//! request carries a [`RequestToken`]; a response whose token has been
//! superseded is dropped, so the visible page always matches the last
//! committed input.

mod autocomplete;
mod debounce;
mod query;

pub use autocomplete::PatientAutocomplete;
pub use debounce::{DebouncePhase, Debouncer, RequestToken};
pub use query::{has_more, FilterField, PatientFilters, SearchInput};

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::decode_row;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::models::{Patient, RecordId};
use crate::store::{Collection, RemoteStore};
use debounce::TokenSource;

/// Point-in-time view of the search for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSnapshot {
    pub results: Vec<Patient>,
    /// 1-based page of the last completed response
    pub page: usize,
    pub total_count: u64,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    pub phase: DebouncePhase,
    /// Input the current results were queried with
    pub applied: SearchInput,
}

#[derive(Default)]
struct SearchState {
    /// What the user has typed so far.
    input: SearchInput,
    /// What the last fresh query was issued with.
    applied: SearchInput,
    results: Vec<Patient>,
    page: usize,
    /// Server rows the loaded window covers, adjusted for local writes; the
    /// next page starts here.
    window_end: usize,
    total_count: u64,
    has_more: bool,
    loading: bool,
    loading_more: bool,
    /// Token of the latest fresh query.
    current: Option<RequestToken>,
}

struct Inner {
    store: Arc<dyn RemoteStore>,
    page_size: usize,
    debouncer: Debouncer,
    tokens: TokenSource,
    state: Mutex<SearchState>,
}

enum Mode {
    Replace { token: RequestToken },
    Append { base: RequestToken },
}

/// Search engine over the patient collection. Cheap to clone.
#[derive(Clone)]
pub struct PatientSearch {
    inner: Arc<Inner>,
}

impl PatientSearch {
    pub fn new(store: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                page_size: config.page_size,
                debouncer: Debouncer::new(config.filter_debounce()),
                tokens: TokenSource::default(),
                state: Mutex::new(SearchState::default()),
            }),
        }
    }

    pub fn page_size(&self) -> usize {
        self.inner.page_size
    }

    /// Update the free-text term; the query follows after the quiet period.
    pub fn set_term(&self, term: impl Into<String>) {
        self.inner.state.lock().input.term = term.into();
        self.schedule_commit();
    }

    /// Update one structured filter; the query follows after the quiet period.
    pub fn set_filter(&self, field: FilterField, value: impl Into<String>) {
        self.inner.state.lock().input.filters.set(field, value);
        self.schedule_commit();
    }

    /// Current (possibly not yet applied) input, for echoing back into fields.
    pub fn input(&self) -> SearchInput {
        self.inner.state.lock().input.clone()
    }

    /// Whether any query has been issued yet.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().current.is_some()
    }

    pub fn results(&self) -> Vec<Patient> {
        self.inner.state.lock().results.clone()
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        let pending = self.inner.debouncer.is_pending();
        let state = self.inner.state.lock();
        let phase = match (pending, state.current) {
            (true, _) => DebouncePhase::Pending,
            (false, Some(token)) => DebouncePhase::Committed(token),
            (false, None) => DebouncePhase::Idle,
        };
        SearchSnapshot {
            results: state.results.clone(),
            page: state.page,
            total_count: state.total_count,
            has_more: state.has_more,
            loading: state.loading,
            loading_more: state.loading_more,
            phase,
            applied: state.applied.clone(),
        }
    }

    /// Apply pending input now instead of waiting for the timer.
    pub async fn flush(&self) {
        self.inner.debouncer.cancel();
        self.commit_input().await;
    }

    /// Reset every filter and show the unfiltered first page.
    pub async fn clear_filters(&self) {
        self.inner.debouncer.cancel();
        self.inner.state.lock().input = SearchInput::default();
        self.search(SearchInput::default(), 1, true).await;
    }

    /// Re-run the applied query from the first page.
    pub async fn refresh(&self) {
        let applied = self.inner.state.lock().applied.clone();
        self.search(applied, 1, true).await;
    }

    /// Fetch the next page and append it. Ignored while a page is already
    /// loading or when the server has nothing more.
    pub async fn load_more(&self) {
        let (input, page, offset, base) = {
            let mut state = self.inner.state.lock();
            let Some(base) = state.current else {
                debug!("load more before any search");
                return;
            };
            if state.loading || state.loading_more || !state.has_more {
                debug!(
                    loading = state.loading,
                    loading_more = state.loading_more,
                    has_more = state.has_more,
                    "load more ignored"
                );
                return;
            }
            state.loading_more = true;
            (state.applied.clone(), state.page + 1, state.window_end, base)
        };
        self.execute(input, page, offset, Mode::Append { base }).await;
    }

    /// Query one page for `input`. `replace` starts a fresh result set (and
    /// supersedes anything in flight); otherwise the page is appended.
    pub async fn search(&self, input: SearchInput, page: usize, replace: bool) {
        let mode = {
            let mut state = self.inner.state.lock();
            if replace {
                let token = self.inner.tokens.next();
                state.applied = input.clone();
                state.current = Some(token);
                state.loading = true;
                state.loading_more = false;
                Mode::Replace { token }
            } else {
                state.loading_more = true;
                let base = *state
                    .current
                    .get_or_insert_with(|| self.inner.tokens.next());
                Mode::Append { base }
            }
        };
        let page = page.max(1);
        let offset = (page - 1) * self.inner.page_size;
        self.execute(input, page, offset, mode).await;
    }

    /// Reflect a locally written patient in the visible page.
    pub fn upsert_local(&self, patient: &Patient) {
        let mut state = self.inner.state.lock();
        if state.current.is_none() {
            return;
        }
        let matches = state.applied.matches(patient);
        let existing = state.results.iter().position(|p| p.id == patient.id);

        match (existing, matches) {
            (Some(pos), true) => state.results[pos] = patient.clone(),
            (Some(pos), false) => {
                state.results.remove(pos);
                state.window_end = state.window_end.saturating_sub(1);
                state.total_count = state.total_count.saturating_sub(1);
            }
            (None, true) => {
                let key = patient.sort_key();
                let pos = state.results.partition_point(|p| p.sort_key() < key);
                // Past the loaded window it will arrive with a later page.
                if pos < state.results.len() || !state.has_more {
                    state.results.insert(pos, patient.clone());
                    state.window_end += 1;
                }
                state.total_count += 1;
            }
            (None, false) => {}
        }
        state.has_more = (state.window_end as u64) < state.total_count;
    }

    /// Drop a deleted patient from the visible page.
    pub fn remove_local(&self, id: RecordId) {
        let mut state = self.inner.state.lock();
        let before = state.results.len();
        state.results.retain(|p| p.id != Some(id));
        if state.results.len() < before {
            state.window_end = state.window_end.saturating_sub(1);
            state.total_count = state.total_count.saturating_sub(1);
            state.has_more = (state.window_end as u64) < state.total_count;
        }
    }

    fn schedule_commit(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                PatientSearch { inner }.commit_input().await;
            }
        });
    }

    /// Promote typed input to applied input, querying only if it changed.
    async fn commit_input(&self) {
        let input = {
            let state = self.inner.state.lock();
            if state.current.is_some() && state.input == state.applied {
                debug!("input unchanged, nothing to commit");
                return;
            }
            state.input.clone()
        };
        self.search(input, 1, true).await;
    }

    async fn execute(&self, input: SearchInput, page: usize, offset: usize, mode: Mode) {
        let (token, replace) = match mode {
            Mode::Replace { token } => (token, true),
            Mode::Append { base } => (base, false),
        };
        info!(token = token.0, page, offset, replace, filtered = !input.is_empty(), "patient search");

        let result = self.fetch(&input, offset).await;

        let mut state = self.inner.state.lock();
        if state.current != Some(token) {
            debug!(token = token.0, "discarding superseded search response");
            return;
        }
        match result {
            Ok((patients, total_count)) => {
                let received = patients.len();
                if replace {
                    state.results = patients;
                } else {
                    for patient in patients {
                        if !state.results.iter().any(|p| p.id == patient.id) {
                            state.results.push(patient);
                        }
                    }
                }
                state.page = page;
                state.window_end = offset + received;
                state.total_count = total_count;
                state.has_more = has_more(offset, received, total_count);
            }
            Err(err) => {
                warn!(token = token.0, page, error = %err, "patient search failed");
                if replace {
                    state.results.clear();
                    state.total_count = 0;
                    state.window_end = 0;
                    state.page = page;
                }
                state.has_more = false;
            }
        }
        if replace {
            state.loading = false;
        } else {
            state.loading_more = false;
        }
    }

    async fn fetch(&self, input: &SearchInput, offset: usize) -> SyncResult<(Vec<Patient>, u64)> {
        let query = input.page_query(offset, self.inner.page_size);
        let page = self.inner.store.query(Collection::Patients, &query).await?;
        let patients = page
            .rows
            .into_iter()
            .map(|row| decode_row(Collection::Patients, row))
            .collect::<SyncResult<Vec<Patient>>>()?;
        Ok((patients, page.total_count))
    }
}
