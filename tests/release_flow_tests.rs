//! Integration tests for the release lifecycle: version suggestion, freeze,
//! schedule listing and changelog.

use chrono::{NaiveDate, TimeZone, Utc};

use confsched::api::{Event, EventId, Room, RoomId, TalkSlot};
use confsched::db::repositories::LocalRepository;
use confsched::db::repository::ScheduleRepository;
use confsched::db::services;
use confsched::services::changes::ScheduleAction;

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
            capacity: Some(300),
        },
    )
    .await
    .unwrap();
    (repo, event_id, room.id.unwrap())
}

async fn add_talk(repo: &LocalRepository, event_id: EventId, room: RoomId, code: &str, hour: u32) {
    let wip = services::wip_schedule(repo, event_id).await.unwrap();
    let start = Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap();
    services::upsert_slot(
        repo,
        &TalkSlot {
            id: None,
            schedule_id: wip.id.unwrap(),
            submission_code: Some(code.to_string()),
            description: None,
            room: Some(room),
            start: Some(start),
            end: Some(start + chrono::Duration::minutes(50)),
            is_visible: false,
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_release_lifecycle_with_suggested_versions() {
    let (repo, event_id, room) = setup().await;
    add_talk(&repo, event_id, room, "AAA", 10).await;

    // First release: suggestion starts at "0.1".
    let suggestion = services::suggest_version(&repo, event_id).await.unwrap();
    assert_eq!(suggestion, "0.1");
    let (first, _) = services::release_schedule(&repo, event_id, &suggestion, None)
        .await
        .unwrap();
    assert_eq!(first.version.as_deref(), Some("0.1"));

    // Second release: the trailing number is incremented.
    add_talk(&repo, event_id, room, "BBB", 12).await;
    let suggestion = services::suggest_version(&repo, event_id).await.unwrap();
    assert_eq!(suggestion, "0.2");
    let (second, _) = services::release_schedule(&repo, event_id, &suggestion, Some("more talks"))
        .await
        .unwrap();

    // Listing: newest release first, WIP last.
    let schedules = services::list_schedules(&repo, event_id).await.unwrap();
    assert_eq!(schedules.len(), 3);
    assert_eq!(schedules[0].version.as_deref(), Some("0.2"));
    assert_eq!(schedules[1].version.as_deref(), Some("0.1"));
    assert_eq!(schedules[2].version, None);
    assert_eq!(schedules[0].slot_count, 2);
    assert_eq!(schedules[1].slot_count, 1);

    // The current schedule is the most recent release.
    let current = services::current_schedule(&repo, event_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, second.id);
}

#[tokio::test]
async fn test_changelog_between_releases() {
    let (repo, event_id, room) = setup().await;
    add_talk(&repo, event_id, room, "AAA", 10).await;
    let (first, _) = services::release_schedule(&repo, event_id, "0.1", None)
        .await
        .unwrap();

    let first_changes = services::schedule_changes(&repo, first.id.unwrap())
        .await
        .unwrap();
    assert_eq!(first_changes.action, ScheduleAction::Create);

    add_talk(&repo, event_id, room, "BBB", 12).await;
    let (second, _) = services::release_schedule(&repo, event_id, "0.2", None)
        .await
        .unwrap();

    let changes = services::schedule_changes(&repo, second.id.unwrap())
        .await
        .unwrap();
    assert_eq!(changes.action, ScheduleAction::Update);
    assert_eq!(changes.count(), 1);
    assert_eq!(changes.new_talks[0].submission_code.as_deref(), Some("BBB"));
}

#[tokio::test]
async fn test_schedule_lookup_by_version_is_case_insensitive() {
    let (repo, event_id, room) = setup().await;
    add_talk(&repo, event_id, room, "AAA", 10).await;
    let (released, _) = services::release_schedule(&repo, event_id, "Sloth", None)
        .await
        .unwrap();

    let found = repo
        .get_schedule_by_version(event_id, "sloth")
        .await
        .unwrap();
    assert_eq!(found.id, released.id);
}

#[tokio::test]
async fn test_unscheduled_slot_is_invisible_after_release() {
    let (repo, event_id, room) = setup().await;
    add_talk(&repo, event_id, room, "AAA", 10).await;

    // A submission without a room never becomes visible.
    let wip = services::wip_schedule(&repo, event_id).await.unwrap();
    services::upsert_slot(
        &repo,
        &TalkSlot {
            id: None,
            schedule_id: wip.id.unwrap(),
            submission_code: Some("DRAFT".into()),
            description: None,
            room: None,
            start: Some(Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 6, 1, 16, 0, 0).unwrap()),
            is_visible: false,
        },
    )
    .await
    .unwrap();

    let (released, _) = services::release_schedule(&repo, event_id, "0.1", None)
        .await
        .unwrap();
    let slots = services::schedule_slots(&repo, released.id.unwrap())
        .await
        .unwrap();

    let scheduled = slots
        .iter()
        .find(|slot| slot.submission_code.as_deref() == Some("AAA"))
        .unwrap();
    let draft = slots
        .iter()
        .find(|slot| slot.submission_code.as_deref() == Some("DRAFT"))
        .unwrap();
    assert!(scheduled.is_visible);
    assert!(!draft.is_visible);
}

#[tokio::test]
async fn test_wip_schedule_survives_releases() {
    let (repo, event_id, room) = setup().await;
    add_talk(&repo, event_id, room, "AAA", 10).await;

    let wip_before = services::wip_schedule(&repo, event_id).await.unwrap();
    services::release_schedule(&repo, event_id, "0.1", None)
        .await
        .unwrap();
    let wip_after = services::wip_schedule(&repo, event_id).await.unwrap();

    // A fresh WIP schedule replaced the released one.
    assert_ne!(wip_before.id, wip_after.id);
    assert!(wip_after.is_wip());

    // It carries copies of the released slots, ready for further editing.
    let slots = services::schedule_slots(&repo, wip_after.id.unwrap())
        .await
        .unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].submission_code.as_deref(), Some("AAA"));
}
