mod common;

use eventhub::error::{AppError, ErrorKind};
use eventhub::models::{EventStatus, EventUpdate, UserUpdate};

use common::{DEMO_ID, WORKSHOP_ID};

#[tokio::test]
async fn seeded_collections_are_served() {
    let api = common::client().await;

    let users = api.get_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().any(|u| u.username == "admin" && u.is_admin()));

    let active = api.get_active_events().await.unwrap();
    assert_eq!(active.len(), 3);
    assert!(active.iter().all(|e| e.registered_count == 0));
}

#[tokio::test]
async fn last_spot_can_be_taken_then_event_is_full() {
    let api = common::client().await;
    api.update_event(
        WORKSHOP_ID,
        &EventUpdate {
            registered_count: Some(7),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    api.register_for_event(DEMO_ID, WORKSHOP_ID).await.unwrap();
    let event = api.get_event(WORKSHOP_ID).await.unwrap();
    assert_eq!(event.registered_count, 8);
    assert!(event.is_full());

    let err = api.register_for_event(common::ADMIN_ID, WORKSHOP_ID).await.unwrap_err();
    assert!(matches!(err, AppError::EventFull));
    assert_eq!(err.kind(), ErrorKind::Business);
}

#[tokio::test]
async fn second_registration_is_rejected() {
    let api = common::client().await;

    let first = api.register_for_event(DEMO_ID, 1).await.unwrap();
    assert_eq!(first.user_id, DEMO_ID);
    assert_eq!(first.event_id, 1);

    let err = api.register_for_event(DEMO_ID, 1).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyRegistered));
    assert_eq!(api.get_event(1).await.unwrap().registered_count, 1);
    assert_eq!(api.get_event_registrations(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn inactive_event_does_not_accept_registrations() {
    let api = common::client().await;
    api.update_event(
        2,
        &EventUpdate {
            status: Some(EventStatus::Cancelled),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = api.register_for_event(DEMO_ID, 2).await.unwrap_err();
    assert!(matches!(err, AppError::EventUnavailable));
    assert_eq!(api.get_active_events().await.unwrap().len(), 2);
}

#[tokio::test]
async fn cancelling_frees_the_spot() {
    let api = common::client().await;
    let registration = api.register_for_event(DEMO_ID, 1).await.unwrap();

    api.cancel_registration(registration.id).await.unwrap();

    assert_eq!(api.get_event(1).await.unwrap().registered_count, 0);
    assert!(api.find_registration(DEMO_ID, 1).await.unwrap().is_none());
    assert!(matches!(
        api.get_registration(registration.id).await,
        Err(AppError::NotFound(_))
    ));

    // The same user may register again afterwards.
    api.register_for_event(DEMO_ID, 1).await.unwrap();
}

#[tokio::test]
async fn deleting_an_event_removes_its_registrations() {
    let api = common::client().await;
    api.register_for_event(DEMO_ID, 1).await.unwrap();
    api.register_for_event(common::ADMIN_ID, 1).await.unwrap();
    api.register_for_event(DEMO_ID, 2).await.unwrap();

    api.delete_event(1).await.unwrap();

    assert!(matches!(api.get_event(1).await, Err(AppError::NotFound(_))));
    assert!(api.get_event_registrations(1).await.unwrap().is_empty());
    assert_eq!(api.get_registrations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_user_cancels_their_registrations() {
    let api = common::client().await;
    api.register_for_event(DEMO_ID, 1).await.unwrap();
    api.register_for_event(DEMO_ID, 3).await.unwrap();

    api.delete_user(DEMO_ID).await.unwrap();

    assert!(matches!(api.get_user(DEMO_ID).await, Err(AppError::NotFound(_))));
    assert!(api.get_user_registrations(DEMO_ID).await.unwrap().is_empty());
    assert_eq!(api.get_event(1).await.unwrap().registered_count, 0);
    assert_eq!(api.get_event(3).await.unwrap().registered_count, 0);
}

#[tokio::test]
async fn user_events_are_joined_and_sorted_by_date() {
    let api = common::client().await;
    // Seeded dates: event 2 in June, event 3 in March, event 1 in February.
    api.register_for_event(DEMO_ID, 2).await.unwrap();
    api.register_for_event(DEMO_ID, 3).await.unwrap();
    api.register_for_event(DEMO_ID, 1).await.unwrap();

    let ids: Vec<_> = api
        .get_user_events(DEMO_ID)
        .await
        .unwrap()
        .iter()
        .map(|entry| entry.event.id)
        .collect();
    assert_eq!(ids, vec![1, 3, 2]);
}

#[tokio::test]
async fn search_matches_text_and_category() {
    let api = common::client().await;

    let hits = api.search_events("jazz", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 2);

    assert_eq!(api.search_events("", Some("Workshop")).await.unwrap().len(), 1);
    assert!(api.search_events("jazz", Some("workshop")).await.unwrap().is_empty());
    assert_eq!(api.search_events("", Some("")).await.unwrap().len(), 3);
}

#[tokio::test]
async fn partial_user_update_keeps_other_fields() {
    let api = common::client().await;
    let before = api.get_user(DEMO_ID).await.unwrap();

    let after = api
        .update_user(
            DEMO_ID,
            &UserUpdate {
                first_name: Some("Dora".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(after.first_name, "Dora");
    assert_eq!(after.email, before.email);
    assert_eq!(after.password, before.password);
    assert_eq!(after.role, before.role);
}

#[tokio::test]
async fn dashboard_counts() {
    let api = common::client().await;
    api.register_for_event(DEMO_ID, 1).await.unwrap();

    let stats = api.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_admins, 1);
    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.active_events, 3);
    assert_eq!(stats.total_registrations, 1);
    assert_eq!(stats.total_capacity, 60 + 120 + 8);
}

#[tokio::test]
async fn missing_records_map_to_not_found() {
    let api = common::client().await;
    assert!(matches!(api.get_event(999).await, Err(AppError::NotFound(_))));
    assert!(matches!(api.get_user(999).await, Err(AppError::NotFound(_))));
    assert!(matches!(
        api.register_for_event(DEMO_ID, 999).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn unreachable_store_is_a_connectivity_error() {
    let api = eventhub::api::ApiClient::new(&common::dead_url().await);
    let err = api.get_events().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    let message = err.to_string();
    assert!(message.starts_with("GET /events failed"), "{message}");
}

#[tokio::test]
async fn missing_collection_is_a_connectivity_error() {
    let base = format!("{}/missing", common::spawn_store().await);
    let err = eventhub::api::ApiClient::new(&base).get_events().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert!(err.to_string().contains("404"), "{err}");
}

#[tokio::test]
async fn duplicate_is_reported_before_a_full_event() {
    let api = common::client().await;
    api.update_event(
        WORKSHOP_ID,
        &EventUpdate {
            registered_count: Some(7),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    api.register_for_event(DEMO_ID, WORKSHOP_ID).await.unwrap();
    assert!(api.get_event(WORKSHOP_ID).await.unwrap().is_full());

    let err = api.register_for_event(DEMO_ID, WORKSHOP_ID).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyRegistered));
}

#[tokio::test]
async fn users_can_be_found_by_field() {
    let api = common::client().await;
    let found = api
        .find_users(&[("username", "demo".to_string())])
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, DEMO_ID);
}
