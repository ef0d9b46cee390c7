//! Realtime notification flags.

mod support;

use std::sync::Arc;

use clinic_sync_core::models::{ActorId, Doctor, Role, Session};
use clinic_sync_core::store::{Collection, RemoteStore};
use clinic_sync_core::{CollectionCache, NotificationCategory, NotificationCenter};
use serde_json::json;
use support::{instrumented, row, seed_doctor, settle, InstrumentedStore};

fn session(store: &InstrumentedStore, role: Role) -> Session {
    Session {
        actor: store.actor(),
        user_name: "mesa.entrada".into(),
        role,
    }
}

#[tokio::test]
async fn test_foreign_insert_raises_flag() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    center.start(&session(&store, Role::Secretary)).await;
    assert_eq!(center.active_feeds(), 6);

    seed_doctor(&backend.session(ActorId::new()), "Paz").await;
    settle().await;

    assert!(center.is_set(NotificationCategory::NewDoctors));
    assert!(center.has_any_notification());
    assert!(!center.is_set(NotificationCategory::NewPatients));
}

#[tokio::test]
async fn test_own_changes_are_ignored() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    center.start(&session(&store, Role::Admin)).await;

    // Through the session itself and through a second tab of the same user.
    let doctors = CollectionCache::<Doctor>::new(store.clone());
    doctors.create(&Doctor::new("Julia", "Paz", "MN-1")).await.unwrap();
    seed_doctor(&backend.session(store.actor()), "Ruiz").await;
    settle().await;

    assert!(!center.has_any_notification());
}

#[tokio::test]
async fn test_prescription_update_has_its_own_flag() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    center.start(&session(&store, Role::Admin)).await;

    let other = backend.session(ActorId::new());
    let doctor_id = seed_doctor(&other, "Paz").await;
    let patient = other
        .insert(
            Collection::Patients,
            row(json!({"first_name": "Ana", "last_name": "Gomez", "document_number": "1"})),
        )
        .await
        .unwrap();
    let prescription = other
        .insert(
            Collection::Prescriptions,
            row(json!({
                "patient_id": patient["id"],
                "doctor_id": doctor_id,
                "issued_on": "2026-10-19",
            })),
        )
        .await
        .unwrap();
    settle().await;
    center.clear_notifications();

    other
        .update(
            Collection::Prescriptions,
            prescription["id"].as_i64().unwrap(),
            row(json!({"diagnosis": "Glaucoma"})),
        )
        .await
        .unwrap();
    settle().await;

    let flags = center.flags();
    assert!(flags.updated_prescriptions);
    assert!(!flags.new_prescriptions);
    assert_eq!(flags.raised(), vec![NotificationCategory::UpdatedPrescriptions]);
}

#[tokio::test]
async fn test_clinician_gets_no_feeds() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    center.start(&session(&store, Role::Doctor)).await;

    assert_eq!(center.active_feeds(), 0);
    seed_doctor(&backend.session(ActorId::new()), "Paz").await;
    settle().await;
    assert!(!center.has_any_notification());
}

#[tokio::test]
async fn test_flags_persist_until_cleared() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    center.start(&session(&store, Role::Admin)).await;

    let other = backend.session(ActorId::new());
    seed_doctor(&other, "Paz").await;
    other
        .insert(Collection::Practices, row(json!({"code": "1", "name": "Fondo de ojo"})))
        .await
        .unwrap();
    settle().await;

    // Unrelated activity does not lower anything.
    seed_doctor(&other, "Ruiz").await;
    settle().await;
    assert!(center.is_set(NotificationCategory::NewDoctors));
    assert!(center.is_set(NotificationCategory::NewPractices));

    center.clear_specific_notification(NotificationCategory::NewDoctors);
    assert!(!center.is_set(NotificationCategory::NewDoctors));
    assert!(center.is_set(NotificationCategory::NewPractices));

    center.clear_notifications();
    assert!(!center.has_any_notification());
}

#[tokio::test]
async fn test_cache_is_not_touched_by_notifications() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    let doctors = CollectionCache::<Doctor>::new(store.clone());
    doctors.load().await;
    center.start(&session(&store, Role::Admin)).await;

    seed_doctor(&backend.session(ActorId::new()), "Paz").await;
    settle().await;

    assert!(center.is_set(NotificationCategory::NewDoctors));
    assert!(doctors.is_empty());
    assert_eq!(store.query_count(Collection::Doctors), 1);
}

#[tokio::test]
async fn test_restart_replaces_feeds() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    let mut rx = center.watch_flags();

    let first = center.start(&session(&store, Role::Admin)).await;
    let second = center.start(&session(&store, Role::Admin)).await;
    assert_eq!(center.active_feeds(), 6);

    assert!(!center.stop(first), "stale handle must not stop the new session");
    assert_eq!(center.active_feeds(), 6);

    seed_doctor(&backend.session(ActorId::new()), "Paz").await;
    settle().await;
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().new_doctors);

    assert!(center.stop(second));
    assert_eq!(center.active_feeds(), 0);

    center.clear_notifications();
    seed_doctor(&backend.session(ActorId::new()), "Ruiz").await;
    settle().await;
    assert!(!center.has_any_notification());
}

#[tokio::test]
async fn test_stop_keeps_raised_flags() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    let handle = center.start(&session(&store, Role::Admin)).await;

    seed_doctor(&backend.session(ActorId::new()), "Paz").await;
    settle().await;
    center.stop(handle);

    assert!(center.is_set(NotificationCategory::NewDoctors));
}

#[tokio::test]
async fn test_subscribe_failure_degrades_gracefully() {
    let (backend, store) = instrumented();
    store.fail_subscribe(true);
    let center = NotificationCenter::new(store.clone());

    center.start(&session(&store, Role::Admin)).await;
    assert_eq!(center.active_feeds(), 0);

    seed_doctor(&backend.session(ActorId::new()), "Paz").await;
    settle().await;
    assert!(!center.has_any_notification());
}

#[tokio::test]
async fn test_own_changes_recognized_by_store_actor() {
    let (backend, store) = instrumented();
    let center = NotificationCenter::new(store.clone());
    // A session minted on its own carries an unrelated actor id.
    center.start(&Session::new("mesa.entrada", Role::Secretary)).await;

    let doctors = CollectionCache::<Doctor>::new(store.clone());
    doctors.create(&Doctor::new("Julia", "Paz", "MN-1")).await.unwrap();
    settle().await;
    assert!(!center.has_any_notification());

    seed_doctor(&backend.session(ActorId::new()), "Ruiz").await;
    settle().await;
    assert!(center.is_set(NotificationCategory::NewDoctors));
}

#[tokio::test]
async fn test_cancelled_start_leaves_no_feeds_behind() {
    let (backend, store) = instrumented();
    let center = Arc::new(NotificationCenter::new(store.clone()));

    store.hold_subscribes(true);
    let start = tokio::spawn({
        let center = Arc::clone(&center);
        let session = session(&store, Role::Admin);
        async move { center.start(&session).await }
    });
    settle().await;
    // First feed (new prescriptions) opens, second subscribe is pending.
    store.release(0);
    settle().await;
    assert_eq!(store.held(), 1);

    start.abort();
    assert!(start.await.unwrap_err().is_cancelled());
    settle().await;

    let other = backend.session(ActorId::new());
    let doctor_id = seed_doctor(&other, "Paz").await;
    let patient = other
        .insert(
            Collection::Patients,
            row(json!({"first_name": "Ana", "last_name": "Gomez", "document_number": "1"})),
        )
        .await
        .unwrap();
    other
        .insert(
            Collection::Prescriptions,
            row(json!({
                "patient_id": patient["id"],
                "doctor_id": doctor_id,
                "issued_on": "2026-10-19",
            })),
        )
        .await
        .unwrap();
    settle().await;

    assert_eq!(center.active_feeds(), 0);
    assert!(!center.has_any_notification());
}
