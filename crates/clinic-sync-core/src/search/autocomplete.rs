//! Lightweight patient lookup for pickers (e.g. choosing the patient of a
//! new prescription).

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::debounce::{Debouncer, RequestToken, TokenSource};
use super::query::SearchInput;
use crate::cache::decode_row;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::models::Patient;
use crate::store::{Collection, RemoteStore};

#[derive(Default)]
struct AutocompleteState {
    term: String,
    suggestions: Vec<Patient>,
    loading: bool,
    current: Option<RequestToken>,
}

struct Inner {
    store: Arc<dyn RemoteStore>,
    limit: usize,
    debouncer: Debouncer,
    tokens: TokenSource,
    state: Mutex<AutocompleteState>,
}

/// Debounced single-page patient lookup.
#[derive(Clone)]
pub struct PatientAutocomplete {
    inner: Arc<Inner>,
}

impl PatientAutocomplete {
    pub fn new(store: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                limit: config.autocomplete_limit,
                debouncer: Debouncer::new(config.autocomplete_debounce()),
                tokens: TokenSource::default(),
                state: Mutex::new(AutocompleteState::default()),
            }),
        }
    }

    /// Update the typed text. A blank term clears suggestions immediately.
    pub fn set_query(&self, term: impl Into<String>) {
        let term = term.into();
        {
            let mut state = self.inner.state.lock();
            if term.trim().is_empty() {
                // Orphan whatever is in flight.
                state.current = Some(self.inner.tokens.next());
                state.term.clear();
                state.suggestions.clear();
                state.loading = false;
                drop(state);
                self.inner.debouncer.cancel();
                return;
            }
            state.term = term;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                PatientAutocomplete { inner }.lookup().await;
            }
        });
    }

    pub fn suggestions(&self) -> Vec<Patient> {
        self.inner.state.lock().suggestions.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    /// Look up the current term now.
    pub async fn flush(&self) {
        if self.inner.debouncer.cancel() {
            self.lookup().await;
        }
    }

    async fn lookup(&self) {
        let (term, token) = {
            let mut state = self.inner.state.lock();
            let token = self.inner.tokens.next();
            state.current = Some(token);
            state.loading = true;
            (state.term.clone(), token)
        };

        let result = self.fetch(&term).await;

        let mut state = self.inner.state.lock();
        if state.current != Some(token) {
            debug!(token = token.0, "discarding superseded suggestions");
            return;
        }
        state.loading = false;
        match result {
            Ok(patients) => state.suggestions = patients,
            Err(err) => {
                warn!(error = %err, "patient lookup failed");
                state.suggestions.clear();
            }
        }
    }

    async fn fetch(&self, term: &str) -> SyncResult<Vec<Patient>> {
        let query = SearchInput::term(term).page_query(0, self.inner.limit);
        let page = self.inner.store.query(Collection::Patients, &query).await?;
        page.rows
            .into_iter()
            .map(|row| decode_row(Collection::Patients, row))
            .collect()
    }
}
