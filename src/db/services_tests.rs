//! Tests for the service layer, run against the in-memory repository.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::api::{Event, EventId, Room, RoomId, ScheduleId, TalkSlot};
use crate::db::repositories::LocalRepository;
use crate::db::repository::RepositoryError;
use crate::db::services;
use crate::services::changes::ScheduleAction;

async fn setup() -> (LocalRepository, EventId, RoomId) {
    let repo = LocalRepository::new();
    let event = services::create_event(
        &repo,
        &Event {
            id: None,
            slug: "democon".into(),
            name: "DemoCon".into(),
            timezone: "Europe/Berlin".into(),
            date_from: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        },
    )
    .await
    .unwrap();
    let event_id = event.id.unwrap();
    let room = services::create_room(
        &repo,
        &Room {
            id: None,
            event_id,
            name: "Main hall".into(),
            capacity: Some(500),
        },
    )
    .await
    .unwrap();
    (repo, event_id, room.id.unwrap())
}

fn slot(schedule_id: ScheduleId, room: RoomId, code: &str, day: u32, hour: u32) -> TalkSlot {
    TalkSlot {
        id: None,
        schedule_id,
        submission_code: Some(code.to_string()),
        description: None,
        room: Some(room),
        start: Some(Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()),
        end: Some(Utc.with_ymd_and_hms(2024, 6, day, hour + 1, 0, 0).unwrap()),
        is_visible: false,
    }
}

#[tokio::test]
async fn test_release_requires_version_name() {
    let (repo, event_id, _) = setup().await;
    let err = services::release_schedule(&repo, event_id, "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
}

#[tokio::test]
async fn test_release_rejects_reserved_names() {
    let (repo, event_id, _) = setup().await;
    for reserved in ["wip", "latest", "WIP", "Latest"] {
        let err = services::release_schedule(&repo, event_id, reserved, None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, RepositoryError::ValidationError { .. }),
            "expected validation error for {:?}",
            reserved
        );
    }
}

#[tokio::test]
async fn test_release_rejects_duplicate_version() {
    let (repo, event_id, _) = setup().await;
    services::release_schedule(&repo, event_id, "v1.0", None)
        .await
        .unwrap();
    let err = services::release_schedule(&repo, event_id, "V1.0", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
}

#[tokio::test]
async fn test_release_sets_version_and_publication_time() {
    let (repo, event_id, _) = setup().await;
    let (released, wip) = services::release_schedule(&repo, event_id, "0.1", Some("first!"))
        .await
        .unwrap();
    assert_eq!(released.version.as_deref(), Some("0.1"));
    assert_eq!(released.comment.as_deref(), Some("first!"));
    assert!(released.published.is_some());
    assert!(wip.is_wip());

    let current = services::current_schedule(&repo, event_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, released.id);
}

#[tokio::test]
async fn test_suggest_version_before_first_release() {
    let (repo, event_id, _) = setup().await;
    assert_eq!(
        services::suggest_version(&repo, event_id).await.unwrap(),
        "0.1"
    );
}

#[tokio::test]
async fn test_suggest_version_after_release() {
    let (repo, event_id, _) = setup().await;
    services::release_schedule(&repo, event_id, "v1.3", None)
        .await
        .unwrap();
    assert_eq!(
        services::suggest_version(&repo, event_id).await.unwrap(),
        "v1.4"
    );
}

#[tokio::test]
async fn test_suggest_version_not_guessable() {
    let (repo, event_id, _) = setup().await;
    services::release_schedule(&repo, event_id, "Nichtnumerisch", None)
        .await
        .unwrap();
    assert_eq!(services::suggest_version(&repo, event_id).await.unwrap(), "");
}

#[tokio::test]
async fn test_changes_of_first_release_are_create() {
    let (repo, event_id, room) = setup().await;
    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    services::upsert_slot(&repo, &slot(wip.id.unwrap(), room, "AAA", 1, 10))
        .await
        .unwrap();
    let (released, _) = services::release_schedule(&repo, event_id, "0.1", None)
        .await
        .unwrap();

    let changes = services::schedule_changes(&repo, released.id.unwrap())
        .await
        .unwrap();
    assert_eq!(changes.action, ScheduleAction::Create);
    assert_eq!(changes.count(), 0);
}

#[tokio::test]
async fn test_changes_detect_new_talk_in_second_release() {
    let (repo, event_id, room) = setup().await;
    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    services::upsert_slot(&repo, &slot(wip.id.unwrap(), room, "AAA", 1, 10))
        .await
        .unwrap();
    services::release_schedule(&repo, event_id, "0.1", None)
        .await
        .unwrap();

    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    services::upsert_slot(&repo, &slot(wip.id.unwrap(), room, "BBB", 2, 11))
        .await
        .unwrap();
    let (second, _) = services::release_schedule(&repo, event_id, "0.2", None)
        .await
        .unwrap();

    let changes = services::schedule_changes(&repo, second.id.unwrap())
        .await
        .unwrap();
    assert_eq!(changes.action, ScheduleAction::Update);
    assert_eq!(changes.new_talks.len(), 1);
    assert_eq!(changes.new_talks[0].submission_code.as_deref(), Some("BBB"));
    assert!(changes.canceled_talks.is_empty());
    assert!(changes.moved_talks.is_empty());
}

#[tokio::test]
async fn test_changes_detect_moved_talk() {
    let (repo, event_id, room) = setup().await;
    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    services::upsert_slot(&repo, &slot(wip.id.unwrap(), room, "AAA", 1, 10))
        .await
        .unwrap();
    services::release_schedule(&repo, event_id, "0.1", None)
        .await
        .unwrap();

    // Move the copied slot to another day in the new WIP.
    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    let mut copied = services::schedule_slots(&repo, wip.id.unwrap())
        .await
        .unwrap()
        .pop()
        .unwrap();
    copied.start = Some(Utc.with_ymd_and_hms(2024, 6, 2, 14, 0, 0).unwrap());
    copied.end = Some(Utc.with_ymd_and_hms(2024, 6, 2, 15, 0, 0).unwrap());
    services::upsert_slot(&repo, &copied).await.unwrap();
    let (second, _) = services::release_schedule(&repo, event_id, "0.2", None)
        .await
        .unwrap();

    let changes = services::schedule_changes(&repo, second.id.unwrap())
        .await
        .unwrap();
    assert_eq!(changes.moved_talks.len(), 1);
    assert_eq!(changes.moved_talks[0].submission_code, "AAA");
    assert!(changes.new_talks.is_empty());
    assert!(changes.canceled_talks.is_empty());
}

#[tokio::test]
async fn test_rollback_restores_released_slots_and_keeps_new_submissions() {
    let (repo, event_id, room) = setup().await;
    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    services::upsert_slot(&repo, &slot(wip.id.unwrap(), room, "AAA", 1, 10))
        .await
        .unwrap();
    services::release_schedule(&repo, event_id, "0.1", None)
        .await
        .unwrap();

    // Schedule a second submission in the new WIP, then roll back to 0.1.
    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    services::upsert_slot(&repo, &slot(wip.id.unwrap(), room, "BBB", 2, 11))
        .await
        .unwrap();
    let (released, new_wip) = services::rollback_schedule(&repo, event_id, "0.1")
        .await
        .unwrap();
    assert_eq!(released.version.as_deref(), Some("0.1"));

    let codes: Vec<Option<String>> = services::schedule_slots(&repo, new_wip.id.unwrap())
        .await
        .unwrap()
        .into_iter()
        .map(|slot| slot.submission_code)
        .collect();
    assert_eq!(codes.len(), 2);
    assert!(codes.contains(&Some("AAA".to_string())));
    assert!(codes.contains(&Some("BBB".to_string())));
}

#[tokio::test]
async fn test_shift_event_by_slug_resolves_event() {
    let (repo, _, _) = setup().await;
    let report = services::shift_event_by_slug(
        &repo,
        "democon",
        NaiveDate::from_ymd_opt(2024, 6, 6).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(report.delta_days, 5);

    let err = services::shift_event_by_slug(
        &repo,
        "no-such-event",
        NaiveDate::from_ymd_opt(2024, 6, 6).unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}
