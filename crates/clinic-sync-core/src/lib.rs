//! Clinic-Sync Core Library
//!
//! Client-side data synchronization for a clinic management application
//! (doctors, patients, practices, social works, prescriptions) backed by a
//! remote relational store with a realtime change feed.
//!
//! # Architecture
//!
//! ```text
//!   UI action ──► CollectionCache<T> ──┐          ┌──► query / insert / update / delete
//!             └─► PatientSearch ───────┼─► RemoteStore
//!                  (debounce, tokens)  │          └──► subscribe(collection, kind)
//!                                      │                        │
//!                          local state updated                  ▼
//!                          on success                 NotificationCenter
//!                                                     (foreign actor? raise flag)
//!                                                               │
//!   UI "refresh" ◄───────────── banner: has_any_notification ◄──┘
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Doctor, Prescription, Session, etc.)
//! - [`store`]: Remote store contract and the SQLite-backed implementation
//! - [`db`]: SQLite schema and generic row operations
//! - [`cache`]: Lazy, single-flight collection cache
//! - [`search`]: Debounced, paginated patient search and autocomplete
//! - [`notify`]: Realtime notification flags
//! - [`context`]: [`ClinicStore`], the per-session context object

pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use cache::{CollectionCache, LoadState};
pub use config::SyncConfig;
pub use context::ClinicStore;
pub use error::{SyncError, SyncResult};
pub use models::{
    ActorId, Doctor, Entity, Laterality, Patient, Practice, Prescription, PrescriptionItem,
    RecordId, Role, Session, SocialWork, SocialWorkPlan,
};
pub use notify::{NotificationCategory, NotificationCenter, NotificationFlags, SubscriptionHandle};
pub use search::{FilterField, PatientAutocomplete, PatientSearch, SearchInput, SearchSnapshot};
pub use store::{
    ChangeEvent, ChangeKind, Collection, RemoteStore, SqliteBackend, SqliteStore, StoreError,
};
