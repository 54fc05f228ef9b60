//! High-level service layer over the repository traits.
//!
//! These free functions carry the business rules that are independent of the
//! storage backend: version name validation, version suggestion, changelog
//! computation. Application code (HTTP handlers, CLI) should call these
//! instead of the repository directly.

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::api::{
    Availability, Event, EventId, Room, Schedule, ScheduleId, ScheduleInfo, ShiftReport, TalkSlot,
    TalkSlotId, RESERVED_VERSIONS,
};
use crate::db::repository::{FullRepository, RepositoryError, RepositoryResult};
use crate::models::next_version;
use crate::services::changes::{calculate_changes, ScheduleChanges};

/// Verify the repository backend is reachable.
pub async fn health_check(repo: &dyn FullRepository) -> RepositoryResult<bool> {
    repo.health_check().await
}

/// Store a new event (and its initial work-in-progress schedule).
pub async fn create_event(repo: &dyn FullRepository, event: &Event) -> RepositoryResult<Event> {
    let stored = repo.create_event(event).await?;
    info!(slug = %stored.slug, "created event");
    Ok(stored)
}

pub async fn get_event(repo: &dyn FullRepository, id: EventId) -> RepositoryResult<Event> {
    repo.get_event(id).await
}

pub async fn get_event_by_slug(repo: &dyn FullRepository, slug: &str) -> RepositoryResult<Event> {
    repo.get_event_by_slug(slug).await
}

pub async fn list_events(repo: &dyn FullRepository) -> RepositoryResult<Vec<Event>> {
    repo.list_events().await
}

pub async fn create_room(repo: &dyn FullRepository, room: &Room) -> RepositoryResult<Room> {
    repo.create_room(room).await
}

pub async fn list_rooms(
    repo: &dyn FullRepository,
    event_id: EventId,
) -> RepositoryResult<Vec<Room>> {
    repo.list_rooms(event_id).await
}

pub async fn create_availability(
    repo: &dyn FullRepository,
    availability: &Availability,
) -> RepositoryResult<Availability> {
    repo.create_availability(availability).await
}

pub async fn list_availabilities(
    repo: &dyn FullRepository,
    event_id: EventId,
) -> RepositoryResult<Vec<Availability>> {
    repo.list_availabilities(event_id).await
}

pub async fn list_schedules(
    repo: &dyn FullRepository,
    event_id: EventId,
) -> RepositoryResult<Vec<ScheduleInfo>> {
    repo.list_schedules(event_id).await
}

pub async fn get_schedule(
    repo: &dyn FullRepository,
    id: ScheduleId,
) -> RepositoryResult<Schedule> {
    repo.get_schedule(id).await
}

pub async fn wip_schedule(
    repo: &dyn FullRepository,
    event_id: EventId,
) -> RepositoryResult<Schedule> {
    repo.wip_schedule(event_id).await
}

pub async fn current_schedule(
    repo: &dyn FullRepository,
    event_id: EventId,
) -> RepositoryResult<Option<Schedule>> {
    repo.current_schedule(event_id).await
}

pub async fn schedule_slots(
    repo: &dyn FullRepository,
    schedule_id: ScheduleId,
) -> RepositoryResult<Vec<TalkSlot>> {
    repo.slots_for_schedule(schedule_id).await
}

pub async fn upsert_slot(
    repo: &dyn FullRepository,
    slot: &TalkSlot,
) -> RepositoryResult<TalkSlot> {
    repo.upsert_slot(slot).await
}

pub async fn delete_slot(
    repo: &dyn FullRepository,
    slot_id: TalkSlotId,
) -> RepositoryResult<()> {
    repo.delete_slot(slot_id).await
}

/// Suggest the next version name for an event's upcoming release.
///
/// Returns the empty string when the previous version is not guessable, in
/// which case the caller has to prompt for manual input.
pub async fn suggest_version(
    repo: &dyn FullRepository,
    event_id: EventId,
) -> RepositoryResult<String> {
    let current = repo.current_schedule(event_id).await?;
    Ok(next_version(
        current.as_ref().and_then(|schedule| schedule.version.as_deref()),
    ))
}

fn validate_version_name(version: &str) -> RepositoryResult<()> {
    if version.is_empty() {
        return Err(RepositoryError::validation(
            "Cannot create a schedule version without a name",
        ));
    }
    if RESERVED_VERSIONS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(version))
    {
        return Err(RepositoryError::validation(format!(
            "Cannot use reserved name \"{}\" for a schedule version",
            version
        )));
    }
    Ok(())
}

/// Release the work-in-progress schedule of an event under `version`.
///
/// Returns the released schedule and the freshly created work-in-progress
/// schedule that replaces it.
pub async fn release_schedule(
    repo: &dyn FullRepository,
    event_id: EventId,
    version: &str,
    comment: Option<&str>,
) -> RepositoryResult<(Schedule, Schedule)> {
    validate_version_name(version)?;
    let (released, wip) = repo
        .freeze_wip_schedule(event_id, version, comment, Utc::now())
        .await?;
    info!(event = %event_id, version, "released schedule");
    Ok((released, wip))
}

/// Reset the work-in-progress schedule of an event to a released version.
pub async fn rollback_schedule(
    repo: &dyn FullRepository,
    event_id: EventId,
    version: &str,
) -> RepositoryResult<(Schedule, Schedule)> {
    let (released, wip) = repo.unfreeze_schedule(event_id, version).await?;
    info!(event = %event_id, version, "rolled work-in-progress schedule back");
    Ok((released, wip))
}

/// Move an event (and everything scheduled within it) to a new start date.
pub async fn shift_event(
    repo: &dyn FullRepository,
    event_id: EventId,
    new_date_from: NaiveDate,
) -> RepositoryResult<ShiftReport> {
    let report = repo.shift_event_times(event_id, new_date_from).await?;
    info!(
        event = %event_id,
        delta_days = report.delta_days,
        slots = report.slots_shifted,
        availabilities = report.availabilities_shifted,
        "shifted event",
    );
    Ok(report)
}

/// Slug-based variant of [`shift_event`] for the admin tooling.
pub async fn shift_event_by_slug(
    repo: &dyn FullRepository,
    slug: &str,
    new_date_from: NaiveDate,
) -> RepositoryResult<ShiftReport> {
    let event = repo.get_event_by_slug(slug).await?;
    let event_id = event.id.ok_or_else(|| {
        RepositoryError::internal("Stored event is missing its primary key")
    })?;
    shift_event(repo, event_id, new_date_from).await
}

/// Compute the changelog of a schedule against the release before it.
pub async fn schedule_changes(
    repo: &dyn FullRepository,
    schedule_id: ScheduleId,
) -> RepositoryResult<ScheduleChanges> {
    let schedule = repo.get_schedule(schedule_id).await?;
    let slots = repo.slots_for_schedule(schedule_id).await?;

    let Some(previous) = repo.previous_schedule(&schedule).await? else {
        return Ok(calculate_changes(&slots, None));
    };
    let previous_id = previous.id.ok_or_else(|| {
        RepositoryError::internal("Stored schedule is missing its primary key")
    })?;
    let previous_slots = repo.slots_for_schedule(previous_id).await?;
    Ok(calculate_changes(&slots, Some(&previous_slots)))
}
