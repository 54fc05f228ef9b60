//! In-memory repository implementation for unit testing and local
//! development.
//!
//! All state lives in a single store behind a `parking_lot::RwLock`.
//! Composite operations (release, rollback, time shift) validate first and
//! mutate only afterwards, under one write guard, which gives the same
//! all-or-nothing behavior the Postgres backend gets from SQL transactions.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use crate::api::{
    Availability, Event, EventId, Room, Schedule, ScheduleId, ScheduleInfo, ShiftReport, TalkSlot,
    TalkSlotId,
};
use crate::db::repository::{
    ErrorContext, EventRepository, RepositoryError, RepositoryResult, ScheduleRepository,
};

#[derive(Debug, Default)]
struct Store {
    events: BTreeMap<i64, Event>,
    schedules: BTreeMap<i64, Schedule>,
    slots: BTreeMap<i64, TalkSlot>,
    rooms: BTreeMap<i64, Room>,
    availabilities: BTreeMap<i64, Availability>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn event(&self, id: EventId) -> RepositoryResult<&Event> {
        self.events.get(&id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Event {} does not exist", id),
                ErrorContext::new("get_event")
                    .with_entity("event")
                    .with_entity_id(id),
            )
        })
    }

    fn schedule_ids_of_event(&self, event_id: EventId) -> HashSet<i64> {
        self.schedules
            .values()
            .filter(|schedule| schedule.event_id == event_id)
            .filter_map(|schedule| schedule.id.map(|id| id.value()))
            .collect()
    }

    fn wip_schedule_id(&self, event_id: EventId) -> Option<i64> {
        self.schedules
            .values()
            .find(|schedule| schedule.event_id == event_id && schedule.is_wip())
            .and_then(|schedule| schedule.id.map(|id| id.value()))
    }

    fn insert_schedule(&mut self, event_id: EventId) -> ScheduleId {
        let id = self.next_id();
        let schedule = Schedule {
            id: Some(ScheduleId::new(id)),
            event_id,
            version: None,
            published: None,
            comment: None,
        };
        self.schedules.insert(id, schedule);
        ScheduleId::new(id)
    }

    fn copy_slot_to(&mut self, slot: &TalkSlot, schedule_id: ScheduleId) -> TalkSlot {
        let id = self.next_id();
        let mut copy = slot.clone();
        copy.id = Some(TalkSlotId::new(id));
        copy.schedule_id = schedule_id;
        self.slots.insert(id, copy.clone());
        copy
    }

    fn slot_count(&self, schedule_id: ScheduleId) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.schedule_id == schedule_id)
            .count()
    }

    fn duplicate_version(&self, event_id: EventId, version: &str) -> bool {
        self.schedules.values().any(|schedule| {
            schedule.event_id == event_id
                && schedule
                    .version
                    .as_deref()
                    .is_some_and(|existing| existing.eq_ignore_ascii_case(version))
        })
    }
}

/// In-memory repository.
#[derive(Debug, Default)]
pub struct LocalRepository {
    store: RwLock<Store>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for LocalRepository {
    async fn create_event(&self, event: &Event) -> RepositoryResult<Event> {
        let mut store = self.store.write();

        if event.slug.is_empty() {
            return Err(RepositoryError::validation("Event slug must not be empty"));
        }
        if event.date_to < event.date_from {
            return Err(RepositoryError::validation(format!(
                "Event ends ({}) before it starts ({})",
                event.date_to, event.date_from
            )));
        }
        if store
            .events
            .values()
            .any(|existing| existing.slug == event.slug)
        {
            return Err(RepositoryError::validation_with_context(
                format!("Event slug \"{}\" is already in use", event.slug),
                ErrorContext::new("create_event").with_entity("event"),
            ));
        }

        let id = store.next_id();
        let mut stored = event.clone();
        stored.id = Some(EventId::new(id));
        store.events.insert(id, stored.clone());

        // Every event starts out with an empty work-in-progress schedule.
        store.insert_schedule(EventId::new(id));

        Ok(stored)
    }

    async fn get_event(&self, id: EventId) -> RepositoryResult<Event> {
        let store = self.store.read();
        store.event(id).cloned()
    }

    async fn get_event_by_slug(&self, slug: &str) -> RepositoryResult<Event> {
        let store = self.store.read();
        store
            .events
            .values()
            .find(|event| event.slug == slug)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("No event with slug \"{}\"", slug),
                    ErrorContext::new("get_event_by_slug")
                        .with_entity("event")
                        .with_entity_id(slug),
                )
            })
    }

    async fn list_events(&self) -> RepositoryResult<Vec<Event>> {
        let store = self.store.read();
        Ok(store.events.values().cloned().collect())
    }

    async fn create_room(&self, room: &Room) -> RepositoryResult<Room> {
        let mut store = self.store.write();
        store.event(room.event_id)?;

        let id = store.next_id();
        let mut stored = room.clone();
        stored.id = Some(crate::api::RoomId::new(id));
        store.rooms.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_rooms(&self, event_id: EventId) -> RepositoryResult<Vec<Room>> {
        let store = self.store.read();
        store.event(event_id)?;
        Ok(store
            .rooms
            .values()
            .filter(|room| room.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn create_availability(
        &self,
        availability: &Availability,
    ) -> RepositoryResult<Availability> {
        let mut store = self.store.write();
        store.event(availability.event_id)?;
        if availability.end <= availability.start {
            return Err(RepositoryError::validation(
                "Availability must end after it starts",
            ));
        }

        let id = store.next_id();
        let mut stored = availability.clone();
        stored.id = Some(crate::api::AvailabilityId::new(id));
        store.availabilities.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_availabilities(
        &self,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Availability>> {
        let store = self.store.read();
        store.event(event_id)?;
        Ok(store
            .availabilities
            .values()
            .filter(|availability| availability.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn shift_event_times(
        &self,
        event_id: EventId,
        new_date_from: NaiveDate,
    ) -> RepositoryResult<ShiftReport> {
        let mut store = self.store.write();

        let delta = {
            let event = store.event(event_id)?;
            new_date_from.signed_duration_since(event.date_from)
        };
        if delta.is_zero() {
            return Ok(ShiftReport::unchanged());
        }

        let schedule_ids = store.schedule_ids_of_event(event_id);

        if let Some(event) = store.events.get_mut(&event_id.value()) {
            event.date_from += delta;
            event.date_to += delta;
        }

        let mut slots_shifted = 0;
        for slot in store
            .slots
            .values_mut()
            .filter(|slot| schedule_ids.contains(&slot.schedule_id.value()))
        {
            let mut touched = false;
            if let Some(start) = slot.start {
                slot.start = Some(start + delta);
                touched = true;
            }
            if let Some(end) = slot.end {
                slot.end = Some(end + delta);
                touched = true;
            }
            if touched {
                slots_shifted += 1;
            }
        }

        let mut availabilities_shifted = 0;
        for availability in store
            .availabilities
            .values_mut()
            .filter(|availability| availability.event_id == event_id)
        {
            availability.start += delta;
            availability.end += delta;
            availabilities_shifted += 1;
        }

        Ok(ShiftReport {
            delta_days: delta.num_days(),
            slots_shifted,
            availabilities_shifted,
        })
    }
}

#[async_trait]
impl ScheduleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn wip_schedule(&self, event_id: EventId) -> RepositoryResult<Schedule> {
        let mut store = self.store.write();
        store.event(event_id)?;

        if let Some(id) = store.wip_schedule_id(event_id) {
            return Ok(store.schedules[&id].clone());
        }
        // Recreate on demand, mirroring get-or-create semantics.
        let id = store.insert_schedule(event_id);
        Ok(store.schedules[&id.value()].clone())
    }

    async fn current_schedule(&self, event_id: EventId) -> RepositoryResult<Option<Schedule>> {
        let store = self.store.read();
        store.event(event_id)?;
        Ok(store
            .schedules
            .values()
            .filter(|schedule| schedule.event_id == event_id && schedule.published.is_some())
            .max_by_key(|schedule| schedule.published)
            .cloned())
    }

    async fn list_schedules(&self, event_id: EventId) -> RepositoryResult<Vec<ScheduleInfo>> {
        let store = self.store.read();
        store.event(event_id)?;

        let mut released: Vec<&Schedule> = store
            .schedules
            .values()
            .filter(|schedule| schedule.event_id == event_id && !schedule.is_wip())
            .collect();
        released.sort_by(|a, b| b.published.cmp(&a.published));

        let mut infos: Vec<ScheduleInfo> = Vec::with_capacity(released.len() + 1);
        for schedule in released {
            let Some(id) = schedule.id else { continue };
            infos.push(ScheduleInfo {
                id,
                event_id,
                version: schedule.version.clone(),
                published: schedule.published,
                slot_count: store.slot_count(id),
            });
        }
        if let Some(wip_id) = store.wip_schedule_id(event_id) {
            let id = ScheduleId::new(wip_id);
            infos.push(ScheduleInfo {
                id,
                event_id,
                version: None,
                published: None,
                slot_count: store.slot_count(id),
            });
        }
        Ok(infos)
    }

    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Schedule> {
        let store = self.store.read();
        store.schedules.get(&id.value()).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Schedule {} does not exist", id),
                ErrorContext::new("get_schedule")
                    .with_entity("schedule")
                    .with_entity_id(id),
            )
        })
    }

    async fn get_schedule_by_version(
        &self,
        event_id: EventId,
        version: &str,
    ) -> RepositoryResult<Schedule> {
        let store = self.store.read();
        store.event(event_id)?;
        store
            .schedules
            .values()
            .find(|schedule| {
                schedule.event_id == event_id
                    && schedule
                        .version
                        .as_deref()
                        .is_some_and(|existing| existing.eq_ignore_ascii_case(version))
            })
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("No schedule version \"{}\" for event {}", version, event_id),
                    ErrorContext::new("get_schedule_by_version")
                        .with_entity("schedule")
                        .with_details(format!("version={}", version)),
                )
            })
    }

    async fn previous_schedule(
        &self,
        schedule: &Schedule,
    ) -> RepositoryResult<Option<Schedule>> {
        let store = self.store.read();
        Ok(store
            .schedules
            .values()
            .filter(|candidate| {
                candidate.event_id == schedule.event_id
                    && candidate.id != schedule.id
                    && candidate.published.is_some()
            })
            .filter(|candidate| match schedule.published {
                Some(published) => candidate.published < Some(published),
                None => true,
            })
            .max_by_key(|candidate| candidate.published)
            .cloned())
    }

    async fn slots_for_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<TalkSlot>> {
        let store = self.store.read();
        if !store.schedules.contains_key(&schedule_id.value()) {
            return Err(RepositoryError::not_found_with_context(
                format!("Schedule {} does not exist", schedule_id),
                ErrorContext::new("slots_for_schedule")
                    .with_entity("schedule")
                    .with_entity_id(schedule_id),
            ));
        }
        Ok(store
            .slots
            .values()
            .filter(|slot| slot.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn upsert_slot(&self, slot: &TalkSlot) -> RepositoryResult<TalkSlot> {
        let mut store = self.store.write();

        let schedule = store
            .schedules
            .get(&slot.schedule_id.value())
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("Schedule {} does not exist", slot.schedule_id),
                    ErrorContext::new("upsert_slot")
                        .with_entity("schedule")
                        .with_entity_id(slot.schedule_id),
                )
            })?;
        if !schedule.is_wip() {
            return Err(RepositoryError::validation_with_context(
                "Released schedules are immutable",
                ErrorContext::new("upsert_slot")
                    .with_entity("schedule")
                    .with_entity_id(slot.schedule_id),
            ));
        }
        if let (Some(start), Some(end)) = (slot.start, slot.end) {
            if end < start {
                return Err(RepositoryError::validation(
                    "Slot must not end before it starts",
                ));
            }
        }

        match slot.id {
            Some(id) => {
                if !store.slots.contains_key(&id.value()) {
                    return Err(RepositoryError::not_found_with_context(
                        format!("Slot {} does not exist", id),
                        ErrorContext::new("upsert_slot")
                            .with_entity("talk_slot")
                            .with_entity_id(id),
                    ));
                }
                store.slots.insert(id.value(), slot.clone());
                Ok(slot.clone())
            }
            None => {
                let id = store.next_id();
                let mut stored = slot.clone();
                stored.id = Some(TalkSlotId::new(id));
                store.slots.insert(id, stored.clone());
                Ok(stored)
            }
        }
    }

    async fn delete_slot(&self, slot_id: TalkSlotId) -> RepositoryResult<()> {
        let mut store = self.store.write();

        let slot = store.slots.get(&slot_id.value()).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Slot {} does not exist", slot_id),
                ErrorContext::new("delete_slot")
                    .with_entity("talk_slot")
                    .with_entity_id(slot_id),
            )
        })?;
        let schedule = store
            .schedules
            .get(&slot.schedule_id.value())
            .ok_or_else(|| {
                RepositoryError::internal("Slot references a missing schedule")
            })?;
        if !schedule.is_wip() {
            return Err(RepositoryError::validation_with_context(
                "Released schedules are immutable",
                ErrorContext::new("delete_slot")
                    .with_entity("schedule")
                    .with_entity_id(slot.schedule_id),
            ));
        }
        store.slots.remove(&slot_id.value());
        Ok(())
    }

    async fn freeze_wip_schedule(
        &self,
        event_id: EventId,
        version: &str,
        comment: Option<&str>,
        published: DateTime<Utc>,
    ) -> RepositoryResult<(Schedule, Schedule)> {
        let mut store = self.store.write();

        store.event(event_id)?;
        if store.duplicate_version(event_id, version) {
            return Err(RepositoryError::validation_with_context(
                format!("Version \"{}\" is already in use for this event", version),
                ErrorContext::new("freeze_wip_schedule")
                    .with_entity("schedule")
                    .with_details(format!("version={}", version)),
            ));
        }
        let wip_id = store.wip_schedule_id(event_id).ok_or_else(|| {
            RepositoryError::internal_with_context(
                format!("Event {} has no work-in-progress schedule", event_id),
                ErrorContext::new("freeze_wip_schedule").with_entity("schedule"),
            )
        })?;

        // All checks passed; from here on every mutation happens under the
        // same write guard.
        let released_id = ScheduleId::new(wip_id);
        if let Some(schedule) = store.schedules.get_mut(&wip_id) {
            schedule.version = Some(version.to_string());
            schedule.comment = comment.map(str::to_string);
            schedule.published = Some(published);
        }

        // Visibility at release time: a slot appears in the public agenda
        // once it is fully scheduled.
        for slot in store
            .slots
            .values_mut()
            .filter(|slot| slot.schedule_id == released_id)
        {
            slot.is_visible = slot.is_scheduled();
        }

        let new_wip_id = store.insert_schedule(event_id);

        let released_slots: Vec<TalkSlot> = store
            .slots
            .values()
            .filter(|slot| slot.schedule_id == released_id)
            .cloned()
            .collect();
        for slot in &released_slots {
            store.copy_slot_to(slot, new_wip_id);
        }

        let released = store.schedules[&wip_id].clone();
        let wip = store.schedules[&new_wip_id.value()].clone();
        Ok((released, wip))
    }

    async fn unfreeze_schedule(
        &self,
        event_id: EventId,
        version: &str,
    ) -> RepositoryResult<(Schedule, Schedule)> {
        let mut store = self.store.write();

        store.event(event_id)?;
        let released = store
            .schedules
            .values()
            .find(|schedule| {
                schedule.event_id == event_id
                    && schedule
                        .version
                        .as_deref()
                        .is_some_and(|existing| existing.eq_ignore_ascii_case(version))
            })
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("No schedule version \"{}\" for event {}", version, event_id),
                    ErrorContext::new("unfreeze_schedule")
                        .with_entity("schedule")
                        .with_details(format!("version={}", version)),
                )
            })?;
        let released_id = released.id.ok_or_else(|| {
            RepositoryError::internal("Stored schedule is missing its primary key")
        })?;

        let old_wip_id = store.wip_schedule_id(event_id);

        let released_slots: Vec<TalkSlot> = store
            .slots
            .values()
            .filter(|slot| slot.schedule_id == released_id)
            .cloned()
            .collect();
        let released_codes: HashSet<String> = released_slots
            .iter()
            .filter_map(|slot| slot.submission_code.clone())
            .collect();

        // Slots of the current WIP for submissions the released version did
        // not schedule survive the rollback.
        let kept_wip_slots: Vec<TalkSlot> = match old_wip_id {
            Some(wip_id) => store
                .slots
                .values()
                .filter(|slot| slot.schedule_id.value() == wip_id)
                .filter(|slot| match &slot.submission_code {
                    Some(code) => !released_codes.contains(code),
                    None => true,
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        let new_wip_id = store.insert_schedule(event_id);
        for slot in released_slots.iter().chain(kept_wip_slots.iter()) {
            store.copy_slot_to(slot, new_wip_id);
        }

        if let Some(wip_id) = old_wip_id {
            store
                .slots
                .retain(|_, slot| slot.schedule_id.value() != wip_id);
            store.schedules.remove(&wip_id);
        }

        let wip = store.schedules[&new_wip_id.value()].clone();
        Ok((released, wip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> Event {
        Event {
            id: None,
            slug: "democon".into(),
            name: "DemoCon".into(),
            timezone: "Europe/Berlin".into(),
            date_from: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_event_creates_wip_schedule() {
        let repo = LocalRepository::new();
        let stored = repo.create_event(&event()).await.unwrap();
        let wip = repo.wip_schedule(stored.id.unwrap()).await.unwrap();
        assert!(wip.is_wip());
    }

    #[tokio::test]
    async fn test_create_event_rejects_duplicate_slug() {
        let repo = LocalRepository::new();
        repo.create_event(&event()).await.unwrap();
        let err = repo.create_event(&event()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_create_event_rejects_inverted_dates() {
        let repo = LocalRepository::new();
        let mut inverted = event();
        inverted.date_to = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let err = repo.create_event(&inverted).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_wip_schedule_is_stable() {
        let repo = LocalRepository::new();
        let stored = repo.create_event(&event()).await.unwrap();
        let first = repo.wip_schedule(stored.id.unwrap()).await.unwrap();
        let second = repo.wip_schedule(stored.id.unwrap()).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_released_schedule_is_immutable() {
        let repo = LocalRepository::new();
        let stored = repo.create_event(&event()).await.unwrap();
        let event_id = stored.id.unwrap();
        let (released, _) = repo
            .freeze_wip_schedule(event_id, "0.1", None, Utc::now())
            .await
            .unwrap();

        let slot = TalkSlot {
            id: None,
            schedule_id: released.id.unwrap(),
            submission_code: Some("AAA".into()),
            description: None,
            room: None,
            start: None,
            end: None,
            is_visible: false,
        };
        let err = repo.upsert_slot(&slot).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_freeze_rejects_duplicate_version_case_insensitive() {
        let repo = LocalRepository::new();
        let stored = repo.create_event(&event()).await.unwrap();
        let event_id = stored.id.unwrap();
        repo.freeze_wip_schedule(event_id, "V1.0", None, Utc::now())
            .await
            .unwrap();
        let err = repo
            .freeze_wip_schedule(event_id, "v1.0", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));

        // The failed release must not have consumed the WIP schedule.
        let wip = repo.wip_schedule(event_id).await.unwrap();
        assert!(wip.is_wip());
    }

    #[tokio::test]
    async fn test_shift_unknown_event_is_not_found() {
        let repo = LocalRepository::new();
        let err = repo
            .shift_event_times(
                EventId::new(4711),
                NaiveDate::from_ymd_opt(2024, 6, 6).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_slots_are_copied_into_next_wip_on_release() {
        let repo = LocalRepository::new();
        let stored = repo.create_event(&event()).await.unwrap();
        let event_id = stored.id.unwrap();
        let wip = repo.wip_schedule(event_id).await.unwrap();
        let room = repo
            .create_room(&Room {
                id: None,
                event_id,
                name: "Main hall".into(),
                capacity: Some(500),
            })
            .await
            .unwrap();

        repo.upsert_slot(&TalkSlot {
            id: None,
            schedule_id: wip.id.unwrap(),
            submission_code: Some("AAA".into()),
            description: None,
            room: room.id,
            start: Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()),
            is_visible: false,
        })
        .await
        .unwrap();

        let (released, new_wip) = repo
            .freeze_wip_schedule(event_id, "0.1", None, Utc::now())
            .await
            .unwrap();

        let released_slots = repo.slots_for_schedule(released.id.unwrap()).await.unwrap();
        let wip_slots = repo.slots_for_schedule(new_wip.id.unwrap()).await.unwrap();
        assert_eq!(released_slots.len(), 1);
        assert_eq!(wip_slots.len(), 1);
        // Visibility was recomputed at release time.
        assert!(released_slots[0].is_visible);
        assert_ne!(released_slots[0].id, wip_slots[0].id);
    }
}
