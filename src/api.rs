//! Public API surface for the confsched backend.
//!
//! This file consolidates the domain types shared by the service layer, the
//! repository backends and the HTTP API. All types derive
//! Serialize/Deserialize for JSON serialization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use crate::services::changes::{MovedTalk, ScheduleAction, ScheduleChanges};

crate::define_id_type!(i64, EventId);
crate::define_id_type!(i64, ScheduleId);
crate::define_id_type!(i64, RoomId);
crate::define_id_type!(i64, TalkSlotId);
crate::define_id_type!(i64, AvailabilityId);

/// Schedule version names that can never be released.
///
/// These are reserved for the agenda URLs that always point at the
/// work-in-progress and most recent schedule respectively.
pub const RESERVED_VERSIONS: [&str; 2] = ["wip", "latest"];

/// A conference event: the root aggregate owning schedules, rooms and
/// availabilities.
///
/// Dates are calendar dates in the event timezone; all slot and availability
/// timestamps are stored in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Database primary key, `None` before the event is stored.
    pub id: Option<EventId>,
    /// URL-safe unique identifier.
    pub slug: String,
    pub name: String,
    /// IANA timezone name, kept opaque.
    pub timezone: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl Event {
    /// Number of event days, inclusive of both end dates.
    pub fn duration_days(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }
}

/// A versioned snapshot of the scheduled talks of one event.
///
/// `version == None` marks the single mutable work-in-progress schedule;
/// once released, `version` and `published` are set and the schedule is
/// immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Option<ScheduleId>,
    pub event_id: EventId,
    pub version: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Shown in the public changelog for this release.
    pub comment: Option<String>,
}

impl Schedule {
    pub fn is_wip(&self) -> bool {
        self.version.is_none()
    }
}

/// A room talks can be scheduled into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Option<RoomId>,
    pub event_id: EventId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
}

/// A scheduled occurrence of a submission (or a break) within one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalkSlot {
    pub id: Option<TalkSlotId>,
    pub schedule_id: ScheduleId,
    /// Submission identifier; `None` marks a break slot.
    pub submission_code: Option<String>,
    /// Free-text label, used for breaks and displayed in exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub room: Option<RoomId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub is_visible: bool,
}

impl TalkSlot {
    /// Slot duration in minutes, if both ends are set.
    pub fn duration(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((end - start).num_seconds() / 60),
            _ => None,
        }
    }

    /// A slot is fully scheduled once it has both a start time and a room.
    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.room.is_some()
    }

    /// Two slots are the same if they place the same submission in the same
    /// room at the same time, regardless of which schedule they belong to.
    pub fn is_same_slot(&self, other: &TalkSlot) -> bool {
        self.submission_code == other.submission_code
            && self.room == other.room
            && self.start == other.start
    }
}

/// A time window during which a resource (room or speaker) is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub id: Option<AvailabilityId>,
    pub event_id: EventId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_code: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Lightweight schedule listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    pub id: ScheduleId,
    pub event_id: EventId,
    pub version: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub slot_count: usize,
}

/// Outcome of shifting an event in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftReport {
    /// Applied offset in whole days (may be negative).
    pub delta_days: i64,
    pub slots_shifted: usize,
    pub availabilities_shifted: usize,
}

impl ShiftReport {
    /// Report for a shift where the target date equals the current one.
    pub fn unchanged() -> Self {
        Self {
            delta_days: 0,
            slots_shifted: 0,
            availabilities_shifted: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(code: Option<&str>, room: Option<i64>, hour: u32) -> TalkSlot {
        TalkSlot {
            id: None,
            schedule_id: ScheduleId::new(1),
            submission_code: code.map(Into::into),
            description: None,
            room: room.map(RoomId::new),
            start: Some(Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 6, 1, hour + 1, 0, 0).unwrap()),
            is_visible: true,
        }
    }

    #[test]
    fn test_event_duration_days() {
        let event = Event {
            id: None,
            slug: "democon".into(),
            name: "DemoCon".into(),
            timezone: "Europe/Berlin".into(),
            date_from: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        };
        assert_eq!(event.duration_days(), 3);
    }

    #[test]
    fn test_slot_duration_minutes() {
        assert_eq!(slot(Some("ABC"), Some(1), 10).duration(), Some(60));
    }

    #[test]
    fn test_slot_duration_unset() {
        let mut s = slot(Some("ABC"), Some(1), 10);
        s.end = None;
        assert_eq!(s.duration(), None);
    }

    #[test]
    fn test_is_same_slot_ignores_schedule() {
        let a = slot(Some("ABC"), Some(1), 10);
        let mut b = slot(Some("ABC"), Some(1), 10);
        b.schedule_id = ScheduleId::new(99);
        assert!(a.is_same_slot(&b));
    }

    #[test]
    fn test_is_same_slot_differs_on_room() {
        let a = slot(Some("ABC"), Some(1), 10);
        let b = slot(Some("ABC"), Some(2), 10);
        assert!(!a.is_same_slot(&b));
    }

    #[test]
    fn test_is_scheduled_requires_room_and_start() {
        let mut s = slot(Some("ABC"), Some(1), 10);
        assert!(s.is_scheduled());
        s.room = None;
        assert!(!s.is_scheduled());
    }

    #[test]
    fn test_wip_schedule_has_no_version() {
        let schedule = Schedule {
            id: None,
            event_id: EventId::new(1),
            version: None,
            published: None,
            comment: None,
        };
        assert!(schedule.is_wip());
    }
}
