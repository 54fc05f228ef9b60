//! Schedule changelog computation.
//!
//! Compares the scheduled talks of a schedule against its predecessor and
//! classifies every difference as a new, canceled or moved talk. The result
//! feeds the public changelog and the release notifications.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{RoomId, TalkSlot};

/// Whether a schedule is the first release or an update to a previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleAction {
    Create,
    Update,
}

/// A talk that kept its submission but changed room and/or start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovedTalk {
    pub submission_code: String,
    pub old_start: Option<DateTime<Utc>>,
    pub new_start: Option<DateTime<Utc>>,
    pub old_room: Option<RoomId>,
    pub new_room: Option<RoomId>,
}

/// Differences between a schedule and the release before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleChanges {
    pub action: ScheduleAction,
    pub new_talks: Vec<TalkSlot>,
    pub canceled_talks: Vec<TalkSlot>,
    pub moved_talks: Vec<MovedTalk>,
}

impl ScheduleChanges {
    fn create() -> Self {
        Self {
            action: ScheduleAction::Create,
            new_talks: Vec::new(),
            canceled_talks: Vec::new(),
            moved_talks: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.new_talks.len() + self.canceled_talks.len() + self.moved_talks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Only slots that actually appear in the public agenda take part in the
/// diff: visible, carrying a submission, fully scheduled.
fn scheduled_talks(slots: &[TalkSlot]) -> Vec<&TalkSlot> {
    slots
        .iter()
        .filter(|slot| slot.submission_code.is_some() && slot.is_visible && slot.is_scheduled())
        .collect()
}

fn by_submission<'a>(slots: &[&'a TalkSlot]) -> BTreeMap<String, Vec<&'a TalkSlot>> {
    let mut grouped: BTreeMap<String, Vec<&TalkSlot>> = BTreeMap::new();
    for &slot in slots {
        if let Some(code) = &slot.submission_code {
            grouped.entry(code.clone()).or_default().push(slot);
        }
    }
    grouped
}

/// Compute the changes of `current` relative to `previous`.
///
/// With no previous schedule the action is `Create` and all lists are
/// empty: the first release has no changelog.
pub fn calculate_changes(
    current: &[TalkSlot],
    previous: Option<&[TalkSlot]>,
) -> ScheduleChanges {
    let Some(previous) = previous else {
        return ScheduleChanges::create();
    };

    let mut result = ScheduleChanges {
        action: ScheduleAction::Update,
        new_talks: Vec::new(),
        canceled_talks: Vec::new(),
        moved_talks: Vec::new(),
    };

    let old_by_submission = by_submission(&scheduled_talks(previous));
    let new_by_submission = by_submission(&scheduled_talks(current));
    let old_codes: BTreeSet<&String> = old_by_submission.keys().collect();
    let new_codes: BTreeSet<&String> = new_by_submission.keys().collect();

    for (code, old_slots) in &old_by_submission {
        if !new_codes.contains(code) {
            result
                .canceled_talks
                .extend(old_slots.iter().copied().cloned());
        }
    }

    for (code, new_slots) in &new_by_submission {
        if !old_codes.contains(code) {
            result.new_talks.extend(new_slots.iter().copied().cloned());
        } else {
            handle_submission_move(code, &old_by_submission[code], new_slots, &mut result);
        }
    }

    result
}

/// Pair up the slots of one submission present in both schedules.
///
/// Slots identical in (submission, room, start) cancel out. Of the
/// remainder, a surplus on the old side is canceled, a surplus on the new
/// side is new, and whatever pairs up positionally has moved.
fn handle_submission_move(
    code: &str,
    old_slots: &[&TalkSlot],
    new_slots: &[&TalkSlot],
    result: &mut ScheduleChanges,
) {
    let mut old_changed: Vec<&TalkSlot> = old_slots
        .iter()
        .filter(|old| !new_slots.iter().any(|new| old.is_same_slot(new)))
        .copied()
        .collect();
    let mut new_changed: Vec<&TalkSlot> = new_slots
        .iter()
        .filter(|new| !old_slots.iter().any(|old| new.is_same_slot(old)))
        .copied()
        .collect();

    if old_changed.len() > new_changed.len() {
        let surplus = old_changed.len() - new_changed.len();
        result
            .canceled_talks
            .extend(old_changed.drain(..surplus).cloned());
    } else if new_changed.len() > old_changed.len() {
        let surplus = new_changed.len() - old_changed.len();
        result.new_talks.extend(new_changed.drain(..surplus).cloned());
    }

    for (old, new) in old_changed.iter().zip(new_changed.iter()) {
        result.moved_talks.push(MovedTalk {
            submission_code: code.to_string(),
            old_start: old.start,
            new_start: new.start,
            old_room: old.room,
            new_room: new.room,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ScheduleId;
    use chrono::TimeZone;

    fn slot(code: &str, room: i64, day: u32, hour: u32) -> TalkSlot {
        TalkSlot {
            id: None,
            schedule_id: ScheduleId::new(1),
            submission_code: Some(code.to_string()),
            description: None,
            room: Some(RoomId::new(room)),
            start: Some(Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 6, day, hour + 1, 0, 0).unwrap()),
            is_visible: true,
        }
    }

    #[test]
    fn test_first_release_is_create() {
        let changes = calculate_changes(&[slot("AAA", 1, 1, 10)], None);
        assert_eq!(changes.action, ScheduleAction::Create);
        assert_eq!(changes.count(), 0);
    }

    #[test]
    fn test_unchanged_schedule_has_no_changes() {
        let old = vec![slot("AAA", 1, 1, 10), slot("BBB", 2, 1, 11)];
        let new = old.clone();
        let changes = calculate_changes(&new, Some(&old));
        assert_eq!(changes.action, ScheduleAction::Update);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_added_submission_is_new() {
        let old = vec![slot("AAA", 1, 1, 10)];
        let new = vec![slot("AAA", 1, 1, 10), slot("BBB", 2, 1, 11)];
        let changes = calculate_changes(&new, Some(&old));
        assert_eq!(changes.new_talks.len(), 1);
        assert_eq!(changes.new_talks[0].submission_code.as_deref(), Some("BBB"));
        assert_eq!(changes.count(), 1);
    }

    #[test]
    fn test_removed_submission_is_canceled() {
        let old = vec![slot("AAA", 1, 1, 10), slot("BBB", 2, 1, 11)];
        let new = vec![slot("AAA", 1, 1, 10)];
        let changes = calculate_changes(&new, Some(&old));
        assert_eq!(changes.canceled_talks.len(), 1);
        assert_eq!(
            changes.canceled_talks[0].submission_code.as_deref(),
            Some("BBB")
        );
    }

    #[test]
    fn test_rescheduled_submission_is_moved() {
        let old = vec![slot("AAA", 1, 1, 10)];
        let new = vec![slot("AAA", 2, 2, 14)];
        let changes = calculate_changes(&new, Some(&old));
        assert!(changes.new_talks.is_empty());
        assert!(changes.canceled_talks.is_empty());
        assert_eq!(changes.moved_talks.len(), 1);
        let moved = &changes.moved_talks[0];
        assert_eq!(moved.submission_code, "AAA");
        assert_eq!(moved.old_room, Some(RoomId::new(1)));
        assert_eq!(moved.new_room, Some(RoomId::new(2)));
    }

    #[test]
    fn test_dropped_second_slot_is_canceled() {
        // Submission had two slots, keeps one unchanged.
        let old = vec![slot("AAA", 1, 1, 10), slot("AAA", 1, 2, 10)];
        let new = vec![slot("AAA", 1, 1, 10)];
        let changes = calculate_changes(&new, Some(&old));
        assert_eq!(changes.canceled_talks.len(), 1);
        assert!(changes.moved_talks.is_empty());
    }

    #[test]
    fn test_added_second_slot_is_new() {
        let old = vec![slot("AAA", 1, 1, 10)];
        let new = vec![slot("AAA", 1, 1, 10), slot("AAA", 1, 2, 10)];
        let changes = calculate_changes(&new, Some(&old));
        assert_eq!(changes.new_talks.len(), 1);
        assert!(changes.moved_talks.is_empty());
    }

    #[test]
    fn test_invisible_slots_are_ignored() {
        let old = vec![slot("AAA", 1, 1, 10)];
        let mut hidden = slot("BBB", 2, 1, 11);
        hidden.is_visible = false;
        let new = vec![slot("AAA", 1, 1, 10), hidden];
        let changes = calculate_changes(&new, Some(&old));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_breaks_are_ignored() {
        let old = vec![slot("AAA", 1, 1, 10)];
        let mut lunch = slot("AAA", 1, 1, 12);
        lunch.submission_code = None;
        lunch.description = Some("Lunch".to_string());
        let new = vec![slot("AAA", 1, 1, 10), lunch];
        let changes = calculate_changes(&new, Some(&old));
        assert!(changes.is_empty());
    }
}
