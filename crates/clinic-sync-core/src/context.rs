//! Per-session context tying the caches, the patient search and the
//! notification center to one remote store.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::cache::CollectionCache;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::models::{Doctor, Patient, Practice, Prescription, RecordId, Session, SocialWork, SocialWorkPlan};
use crate::notify::{NotificationCenter, SubscriptionHandle};
use crate::search::{PatientAutocomplete, PatientSearch};
use crate::store::RemoteStore;

/// Everything the UI reads and writes clinic data through.
///
/// Create one per authenticated session and pass it down explicitly.
pub struct ClinicStore {
    config: SyncConfig,
    doctors: CollectionCache<Doctor>,
    patients: CollectionCache<Patient>,
    practices: CollectionCache<Practice>,
    social_works: CollectionCache<SocialWork>,
    social_work_plans: CollectionCache<SocialWorkPlan>,
    prescriptions: CollectionCache<Prescription>,
    patient_search: PatientSearch,
    patient_lookup: PatientAutocomplete,
    notifications: NotificationCenter,
}

impl ClinicStore {
    pub fn new(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            doctors: CollectionCache::new(Arc::clone(&store)),
            patients: CollectionCache::new(Arc::clone(&store)),
            practices: CollectionCache::new(Arc::clone(&store)),
            social_works: CollectionCache::new(Arc::clone(&store)),
            social_work_plans: CollectionCache::new(Arc::clone(&store)),
            prescriptions: CollectionCache::new(Arc::clone(&store)),
            patient_search: PatientSearch::new(Arc::clone(&store), &config),
            patient_lookup: PatientAutocomplete::new(Arc::clone(&store), &config),
            notifications: NotificationCenter::new(store),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn doctors(&self) -> &CollectionCache<Doctor> {
        &self.doctors
    }

    /// Patient writes. Prefer [`ClinicStore::create_patient`] and friends,
    /// which also keep the visible search page current.
    pub fn patients(&self) -> &CollectionCache<Patient> {
        &self.patients
    }

    pub fn practices(&self) -> &CollectionCache<Practice> {
        &self.practices
    }

    pub fn social_works(&self) -> &CollectionCache<SocialWork> {
        &self.social_works
    }

    pub fn social_work_plans(&self) -> &CollectionCache<SocialWorkPlan> {
        &self.social_work_plans
    }

    pub fn prescriptions(&self) -> &CollectionCache<Prescription> {
        &self.prescriptions
    }

    pub fn patient_search(&self) -> &PatientSearch {
        &self.patient_search
    }

    pub fn patient_lookup(&self) -> &PatientAutocomplete {
        &self.patient_lookup
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Create a patient; the returned record carries the new id.
    pub async fn create_patient(&self, patient: &Patient) -> SyncResult<Patient> {
        let created = self.patients.create(patient).await?;
        self.patient_search.upsert_local(&created);
        Ok(created)
    }

    pub async fn update_patient<P: Serialize + Sync>(&self, id: RecordId, patch: &P) -> SyncResult<Patient> {
        let updated = self.patients.update(id, patch).await?;
        self.patient_search.upsert_local(&updated);
        Ok(updated)
    }

    pub async fn delete_patient(&self, id: RecordId) -> SyncResult<()> {
        self.patients.delete(id).await?;
        self.patient_search.remove_local(id);
        Ok(())
    }

    /// Plans of one social work, from the cached plans.
    pub fn plans_for(&self, social_work_id: RecordId) -> Vec<SocialWorkPlan> {
        self.social_work_plans
            .items()
            .into_iter()
            .filter(|plan| plan.social_work_id == social_work_id)
            .collect()
    }

    /// Begin realtime notices for the signed-in session.
    pub async fn start_session(&self, session: &Session) -> SubscriptionHandle {
        self.notifications.start(session).await
    }

    /// Tear down notices and forget flags (sign-out).
    pub fn end_session(&self) {
        self.notifications.stop_all();
        self.notifications.clear_notifications();
    }

    /// Global refresh: clear the notification banner, then reload every
    /// collection in use and re-run the patient query.
    ///
    /// Flags are cleared before any reload starts; a change that arrives
    /// while the refresh is running raises its flag again and keeps it.
    pub async fn refresh(&self) {
        info!("refreshing clinic data");
        self.notifications.clear_notifications();
        futures::join!(
            self.doctors.invalidate_and_reload(),
            self.patients.invalidate_and_reload(),
            self.practices.invalidate_and_reload(),
            self.social_works.invalidate_and_reload(),
            self.social_work_plans.invalidate_and_reload(),
            self.prescriptions.invalidate_and_reload(),
        );
        if self.patient_search.is_active() {
            self.patient_search.refresh().await;
        }
    }
}
