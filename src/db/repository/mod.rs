//! Repository trait definitions.
//!
//! The traits in this module abstract the persistence backend so that the
//! service layer works unchanged against the in-memory repository and the
//! Postgres implementation. Composite operations (release, rollback, time
//! shift) are single trait methods so each backend can run them as one
//! atomic unit of work.

pub mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::api::{
    Availability, Event, EventId, Room, Schedule, ScheduleId, ScheduleInfo, ShiftReport, TalkSlot,
    TalkSlotId,
};

/// Repository operations on events and the resources they own.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Store a new event and create its work-in-progress schedule.
    ///
    /// Fails with a validation error if the slug is already taken or the
    /// date range is inverted.
    async fn create_event(&self, event: &Event) -> RepositoryResult<Event>;

    /// Fetch an event by primary key.
    async fn get_event(&self, id: EventId) -> RepositoryResult<Event>;

    /// Fetch an event by its slug.
    async fn get_event_by_slug(&self, slug: &str) -> RepositoryResult<Event>;

    /// List all stored events.
    async fn list_events(&self) -> RepositoryResult<Vec<Event>>;

    /// Store a new room for an event.
    async fn create_room(&self, room: &Room) -> RepositoryResult<Room>;

    /// List the rooms of an event.
    async fn list_rooms(&self, event_id: EventId) -> RepositoryResult<Vec<Room>>;

    /// Store a new availability window for an event resource.
    async fn create_availability(
        &self,
        availability: &Availability,
    ) -> RepositoryResult<Availability>;

    /// List the availability windows of an event.
    async fn list_availabilities(&self, event_id: EventId)
        -> RepositoryResult<Vec<Availability>>;

    /// Move an event to a new start date, shifting `date_from`/`date_to`,
    /// every talk slot of every schedule of the event, and every
    /// availability by the same whole-day delta.
    ///
    /// Runs as one atomic unit: either every record moves or none does.
    /// A target date equal to the current start date succeeds without
    /// touching any record.
    async fn shift_event_times(
        &self,
        event_id: EventId,
        new_date_from: NaiveDate,
    ) -> RepositoryResult<ShiftReport>;
}

/// Repository operations on schedules and their slots.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Verify the backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// The single mutable work-in-progress schedule of an event.
    async fn wip_schedule(&self, event_id: EventId) -> RepositoryResult<Schedule>;

    /// The most recently published schedule, if any release happened yet.
    async fn current_schedule(&self, event_id: EventId) -> RepositoryResult<Option<Schedule>>;

    /// List all schedules of an event, most recently published first, the
    /// work-in-progress schedule last.
    async fn list_schedules(&self, event_id: EventId) -> RepositoryResult<Vec<ScheduleInfo>>;

    /// Fetch a schedule by primary key.
    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Schedule>;

    /// Fetch a released schedule of an event by its version name
    /// (case-insensitive).
    async fn get_schedule_by_version(
        &self,
        event_id: EventId,
        version: &str,
    ) -> RepositoryResult<Schedule>;

    /// The schedule released immediately before the given one, if any.
    async fn previous_schedule(&self, schedule: &Schedule)
        -> RepositoryResult<Option<Schedule>>;

    /// All talk slots of a schedule.
    async fn slots_for_schedule(&self, schedule_id: ScheduleId)
        -> RepositoryResult<Vec<TalkSlot>>;

    /// Insert or update a slot. Only slots of the work-in-progress schedule
    /// may be written; released schedules are immutable.
    async fn upsert_slot(&self, slot: &TalkSlot) -> RepositoryResult<TalkSlot>;

    /// Delete a slot from the work-in-progress schedule.
    async fn delete_slot(&self, slot_id: TalkSlotId) -> RepositoryResult<()>;

    /// Release the work-in-progress schedule under the given version name.
    ///
    /// Atomically stamps version/comment/publication time, recomputes slot
    /// visibility, creates the next work-in-progress schedule and copies
    /// every slot into it. Returns `(released, new_wip)`.
    ///
    /// Fails with a validation error if the version is already used by this
    /// event (case-insensitive); the name itself is validated by the
    /// service layer.
    async fn freeze_wip_schedule(
        &self,
        event_id: EventId,
        version: &str,
        comment: Option<&str>,
        published: DateTime<Utc>,
    ) -> RepositoryResult<(Schedule, Schedule)>;

    /// Reset the work-in-progress schedule to a released version.
    ///
    /// Atomically replaces the WIP schedule with a copy of the released
    /// version's slots, keeping WIP slots for submissions the released
    /// version did not contain. Returns `(released, new_wip)`.
    async fn unfreeze_schedule(
        &self,
        event_id: EventId,
        version: &str,
    ) -> RepositoryResult<(Schedule, Schedule)>;
}

/// Convenience trait for backends implementing the full repository surface.
pub trait FullRepository: EventRepository + ScheduleRepository {}

impl<T: EventRepository + ScheduleRepository + ?Sized> FullRepository for T {}
