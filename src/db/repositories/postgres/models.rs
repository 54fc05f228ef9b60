use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

use super::schema::{availabilities, events, rooms, schedules, talk_slots};
use crate::api::{
    Availability, AvailabilityId, Event, EventId, Room, RoomId, Schedule, ScheduleId, TalkSlot,
    TalkSlotId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at used only for database operations
pub struct EventRow {
    pub event_id: i64,
    pub slug: String,
    pub event_name: String,
    pub timezone: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: Some(EventId::new(row.event_id)),
            slug: row.slug,
            name: row.event_name,
            timezone: row.timezone,
            date_from: row.date_from,
            date_to: row.date_to,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = events)]
pub struct NewEventRow {
    pub slug: String,
    pub event_name: String,
    pub timezone: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at used only for database operations
pub struct RoomRow {
    pub room_id: i64,
    pub event_id: i64,
    pub room_name: String,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: Some(RoomId::new(row.room_id)),
            event_id: EventId::new(row.event_id),
            name: row.room_name,
            capacity: row.capacity,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rooms)]
pub struct NewRoomRow {
    pub event_id: i64,
    pub room_name: String,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at used only for database operations
pub struct ScheduleRow {
    pub schedule_id: i64,
    pub event_id: i64,
    pub version: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Schedule {
            id: Some(ScheduleId::new(row.schedule_id)),
            event_id: EventId::new(row.event_id),
            version: row.version,
            published: row.published,
            comment: row.comment,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schedules)]
pub struct NewScheduleRow {
    pub event_id: i64,
    pub version: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = talk_slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at used only for database operations
pub struct TalkSlotRow {
    pub slot_id: i64,
    pub schedule_id: i64,
    pub submission_code: Option<String>,
    pub description: Option<String>,
    pub room_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TalkSlotRow> for TalkSlot {
    fn from(row: TalkSlotRow) -> Self {
        TalkSlot {
            id: Some(TalkSlotId::new(row.slot_id)),
            schedule_id: ScheduleId::new(row.schedule_id),
            submission_code: row.submission_code,
            description: row.description,
            room: row.room_id.map(RoomId::new),
            start: row.start_time,
            end: row.end_time,
            is_visible: row.is_visible,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = talk_slots)]
pub struct NewTalkSlotRow {
    pub schedule_id: i64,
    pub submission_code: Option<String>,
    pub description: Option<String>,
    pub room_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_visible: bool,
}

impl NewTalkSlotRow {
    /// Row copying an existing slot into another schedule.
    pub fn copy_of(slot: &TalkSlot, schedule_id: i64) -> Self {
        Self {
            schedule_id,
            submission_code: slot.submission_code.clone(),
            description: slot.description.clone(),
            room_id: slot.room.map(|id| id.value()),
            start_time: slot.start,
            end_time: slot.end,
            is_visible: slot.is_visible,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = availabilities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at used only for database operations
pub struct AvailabilityRow {
    pub availability_id: i64,
    pub event_id: i64,
    pub room_id: Option<i64>,
    pub speaker_code: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<AvailabilityRow> for Availability {
    fn from(row: AvailabilityRow) -> Self {
        Availability {
            id: Some(AvailabilityId::new(row.availability_id)),
            event_id: EventId::new(row.event_id),
            room: row.room_id.map(RoomId::new),
            speaker_code: row.speaker_code,
            start: row.start_time,
            end: row.end_time,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = availabilities)]
pub struct NewAvailabilityRow {
    pub event_id: i64,
    pub room_id: Option<i64>,
    pub speaker_code: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
