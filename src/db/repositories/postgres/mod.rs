//! Postgres repository implementation using Diesel.
//!
//! Implements the repository traits against a Postgres database. Composite
//! operations (release, rollback, time shift) run inside a single SQL
//! transaction so concurrent readers never observe partial state.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::api::{
    Availability, Event, EventId, Room, Schedule, ScheduleId, ScheduleInfo, ShiftReport, TalkSlot,
    TalkSlotId,
};
use crate::db::repository::{
    ErrorContext, EventRepository, RepositoryError, RepositoryResult, ScheduleRepository,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let parse_var = |name: &str, default: u64| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            database_url,
            max_pool_size: parse_var("PG_POOL_MAX", 10) as u32,
            min_pool_size: parse_var("PG_POOL_MIN", 1) as u32,
            connection_timeout_sec: parse_var("PG_CONN_TIMEOUT_SEC", 30),
            idle_timeout_sec: parse_var("PG_IDLE_TIMEOUT_SEC", 600),
            max_retries: parse_var("PG_MAX_RETRIES", 3) as u32,
            retry_delay_ms: parse_var("PG_RETRY_DELAY_MS", 100),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient
    /// failures (connection errors, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn load_event(conn: &mut PgConnection, id: i64) -> RepositoryResult<EventRow> {
    events::table
        .find(id)
        .select(EventRow::as_select())
        .first::<EventRow>(conn)
        .optional()
        .map_err(map_diesel_error)?
        .ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Event {} does not exist", id),
                ErrorContext::new("get_event")
                    .with_entity("event")
                    .with_entity_id(id),
            )
        })
}

fn load_wip_schedule(conn: &mut PgConnection, event_id: i64) -> RepositoryResult<Option<ScheduleRow>> {
    schedules::table
        .filter(schedules::event_id.eq(event_id))
        .filter(schedules::version.is_null())
        .select(ScheduleRow::as_select())
        .first::<ScheduleRow>(conn)
        .optional()
        .map_err(map_diesel_error)
}

fn insert_wip_schedule(conn: &mut PgConnection, event_id: i64) -> RepositoryResult<ScheduleRow> {
    diesel::insert_into(schedules::table)
        .values(NewScheduleRow {
            event_id,
            version: None,
            published: None,
            comment: None,
        })
        .returning(ScheduleRow::as_returning())
        .get_result::<ScheduleRow>(conn)
        .map_err(map_diesel_error)
}

fn find_released_by_version(
    conn: &mut PgConnection,
    event_id: i64,
    version: &str,
) -> RepositoryResult<Option<ScheduleRow>> {
    let released: Vec<ScheduleRow> = schedules::table
        .filter(schedules::event_id.eq(event_id))
        .filter(schedules::version.is_not_null())
        .select(ScheduleRow::as_select())
        .load::<ScheduleRow>(conn)
        .map_err(map_diesel_error)?;
    Ok(released.into_iter().find(|row| {
        row.version
            .as_deref()
            .is_some_and(|existing| existing.eq_ignore_ascii_case(version))
    }))
}

fn load_slots(conn: &mut PgConnection, schedule_id: i64) -> RepositoryResult<Vec<TalkSlotRow>> {
    talk_slots::table
        .filter(talk_slots::schedule_id.eq(schedule_id))
        .select(TalkSlotRow::as_select())
        .load::<TalkSlotRow>(conn)
        .map_err(map_diesel_error)
}

#[async_trait]
impl EventRepository for PostgresRepository {
    async fn create_event(&self, event: &Event) -> RepositoryResult<Event> {
        if event.slug.is_empty() {
            return Err(RepositoryError::validation("Event slug must not be empty"));
        }
        if event.date_to < event.date_from {
            return Err(RepositoryError::validation(format!(
                "Event ends ({}) before it starts ({})",
                event.date_to, event.date_from
            )));
        }

        let event = event.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let taken: i64 = events::table
                    .filter(events::slug.eq(&event.slug))
                    .count()
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                if taken > 0 {
                    return Err(RepositoryError::validation_with_context(
                        format!("Event slug \"{}\" is already in use", event.slug),
                        ErrorContext::new("create_event").with_entity("event"),
                    ));
                }

                let row: EventRow = diesel::insert_into(events::table)
                    .values(NewEventRow {
                        slug: event.slug.clone(),
                        event_name: event.name.clone(),
                        timezone: event.timezone.clone(),
                        date_from: event.date_from,
                        date_to: event.date_to,
                    })
                    .returning(EventRow::as_returning())
                    .get_result(tx)
                    .map_err(map_diesel_error)?;

                // Every event starts out with an empty WIP schedule.
                insert_wip_schedule(tx, row.event_id)?;

                Ok(Event::from(row))
            })
        })
        .await
    }

    async fn get_event(&self, id: EventId) -> RepositoryResult<Event> {
        self.with_conn(move |conn| load_event(conn, id.value()).map(Event::from))
            .await
    }

    async fn get_event_by_slug(&self, slug: &str) -> RepositoryResult<Event> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            events::table
                .filter(events::slug.eq(&slug))
                .select(EventRow::as_select())
                .first::<EventRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Event::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("No event with slug \"{}\"", slug),
                        ErrorContext::new("get_event_by_slug")
                            .with_entity("event")
                            .with_entity_id(&slug),
                    )
                })
        })
        .await
    }

    async fn list_events(&self) -> RepositoryResult<Vec<Event>> {
        self.with_conn(|conn| {
            let rows: Vec<EventRow> = events::table
                .order(events::event_id.asc())
                .select(EventRow::as_select())
                .load::<EventRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Event::from).collect())
        })
        .await
    }

    async fn create_room(&self, room: &Room) -> RepositoryResult<Room> {
        let room = room.clone();
        self.with_conn(move |conn| {
            load_event(conn, room.event_id.value())?;
            let row: RoomRow = diesel::insert_into(rooms::table)
                .values(NewRoomRow {
                    event_id: room.event_id.value(),
                    room_name: room.name.clone(),
                    capacity: room.capacity,
                })
                .returning(RoomRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(Room::from(row))
        })
        .await
    }

    async fn list_rooms(&self, event_id: EventId) -> RepositoryResult<Vec<Room>> {
        self.with_conn(move |conn| {
            load_event(conn, event_id.value())?;
            let rows: Vec<RoomRow> = rooms::table
                .filter(rooms::event_id.eq(event_id.value()))
                .order(rooms::room_id.asc())
                .select(RoomRow::as_select())
                .load::<RoomRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Room::from).collect())
        })
        .await
    }

    async fn create_availability(
        &self,
        availability: &Availability,
    ) -> RepositoryResult<Availability> {
        if availability.end <= availability.start {
            return Err(RepositoryError::validation(
                "Availability must end after it starts",
            ));
        }

        let availability = availability.clone();
        self.with_conn(move |conn| {
            load_event(conn, availability.event_id.value())?;
            let row: AvailabilityRow = diesel::insert_into(availabilities::table)
                .values(NewAvailabilityRow {
                    event_id: availability.event_id.value(),
                    room_id: availability.room.map(|id| id.value()),
                    speaker_code: availability.speaker_code.clone(),
                    start_time: availability.start,
                    end_time: availability.end,
                })
                .returning(AvailabilityRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(Availability::from(row))
        })
        .await
    }

    async fn list_availabilities(
        &self,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Availability>> {
        self.with_conn(move |conn| {
            load_event(conn, event_id.value())?;
            let rows: Vec<AvailabilityRow> = availabilities::table
                .filter(availabilities::event_id.eq(event_id.value()))
                .order(availabilities::availability_id.asc())
                .select(AvailabilityRow::as_select())
                .load::<AvailabilityRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Availability::from).collect())
        })
        .await
    }

    async fn shift_event_times(
        &self,
        event_id: EventId,
        new_date_from: NaiveDate,
    ) -> RepositoryResult<ShiftReport> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let event = load_event(tx, event_id.value())?;
                let delta = new_date_from.signed_duration_since(event.date_from);
                if delta.is_zero() {
                    return Ok(ShiftReport::unchanged());
                }

                diesel::update(events::table.find(event.event_id))
                    .set((
                        events::date_from.eq(event.date_from + delta),
                        events::date_to.eq(event.date_to + delta),
                    ))
                    .execute(tx)
                    .map_err(map_diesel_error)?;

                let schedule_ids: Vec<i64> = schedules::table
                    .filter(schedules::event_id.eq(event.event_id))
                    .select(schedules::schedule_id)
                    .load::<i64>(tx)
                    .map_err(map_diesel_error)?;

                let slots: Vec<TalkSlotRow> = talk_slots::table
                    .filter(talk_slots::schedule_id.eq_any(&schedule_ids))
                    .select(TalkSlotRow::as_select())
                    .load::<TalkSlotRow>(tx)
                    .map_err(map_diesel_error)?;

                let mut slots_shifted = 0;
                for slot in &slots {
                    if slot.start_time.is_none() && slot.end_time.is_none() {
                        continue;
                    }
                    diesel::update(talk_slots::table.find(slot.slot_id))
                        .set((
                            talk_slots::start_time.eq(slot.start_time.map(|t| t + delta)),
                            talk_slots::end_time.eq(slot.end_time.map(|t| t + delta)),
                        ))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                    slots_shifted += 1;
                }

                let windows: Vec<AvailabilityRow> = availabilities::table
                    .filter(availabilities::event_id.eq(event.event_id))
                    .select(AvailabilityRow::as_select())
                    .load::<AvailabilityRow>(tx)
                    .map_err(map_diesel_error)?;

                let availabilities_shifted = windows.len();
                for window in &windows {
                    diesel::update(availabilities::table.find(window.availability_id))
                        .set((
                            availabilities::start_time.eq(window.start_time + delta),
                            availabilities::end_time.eq(window.end_time + delta),
                        ))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                Ok(ShiftReport {
                    delta_days: delta.num_days(),
                    slots_shifted,
                    availabilities_shifted,
                })
            })
        })
        .await
    }
}

#[async_trait]
impl ScheduleRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(true)
        })
        .await
    }

    async fn wip_schedule(&self, event_id: EventId) -> RepositoryResult<Schedule> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                load_event(tx, event_id.value())?;
                if let Some(row) = load_wip_schedule(tx, event_id.value())? {
                    return Ok(Schedule::from(row));
                }
                // Recreate on demand, mirroring get-or-create semantics.
                insert_wip_schedule(tx, event_id.value()).map(Schedule::from)
            })
        })
        .await
    }

    async fn current_schedule(&self, event_id: EventId) -> RepositoryResult<Option<Schedule>> {
        self.with_conn(move |conn| {
            load_event(conn, event_id.value())?;
            let row: Option<ScheduleRow> = schedules::table
                .filter(schedules::event_id.eq(event_id.value()))
                .filter(schedules::published.is_not_null())
                .order(schedules::published.desc())
                .select(ScheduleRow::as_select())
                .first::<ScheduleRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            Ok(row.map(Schedule::from))
        })
        .await
    }

    async fn list_schedules(&self, event_id: EventId) -> RepositoryResult<Vec<ScheduleInfo>> {
        self.with_conn(move |conn| {
            load_event(conn, event_id.value())?;
            let mut rows: Vec<ScheduleRow> = schedules::table
                .filter(schedules::event_id.eq(event_id.value()))
                .select(ScheduleRow::as_select())
                .load::<ScheduleRow>(conn)
                .map_err(map_diesel_error)?;
            // Most recently published first, the WIP schedule last.
            rows.sort_by(|a, b| match (a.published, b.published) {
                (Some(pa), Some(pb)) => pb.cmp(&pa),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.schedule_id.cmp(&b.schedule_id),
            });

            let ids: Vec<i64> = rows.iter().map(|row| row.schedule_id).collect();
            let slot_schedule_ids: Vec<i64> = talk_slots::table
                .filter(talk_slots::schedule_id.eq_any(&ids))
                .select(talk_slots::schedule_id)
                .load::<i64>(conn)
                .map_err(map_diesel_error)?;

            Ok(rows
                .into_iter()
                .map(|row| ScheduleInfo {
                    id: ScheduleId::new(row.schedule_id),
                    event_id,
                    slot_count: slot_schedule_ids
                        .iter()
                        .filter(|id| **id == row.schedule_id)
                        .count(),
                    version: row.version,
                    published: row.published,
                })
                .collect())
        })
        .await
    }

    async fn get_schedule(&self, id: ScheduleId) -> RepositoryResult<Schedule> {
        self.with_conn(move |conn| {
            schedules::table
                .find(id.value())
                .select(ScheduleRow::as_select())
                .first::<ScheduleRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Schedule::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("Schedule {} does not exist", id),
                        ErrorContext::new("get_schedule")
                            .with_entity("schedule")
                            .with_entity_id(id),
                    )
                })
        })
        .await
    }

    async fn get_schedule_by_version(
        &self,
        event_id: EventId,
        version: &str,
    ) -> RepositoryResult<Schedule> {
        let version = version.to_string();
        self.with_conn(move |conn| {
            load_event(conn, event_id.value())?;
            find_released_by_version(conn, event_id.value(), &version)?
                .map(Schedule::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("No schedule version \"{}\" for event {}", version, event_id),
                        ErrorContext::new("get_schedule_by_version")
                            .with_entity("schedule")
                            .with_details(format!("version={}", version)),
                    )
                })
        })
        .await
    }

    async fn previous_schedule(
        &self,
        schedule: &Schedule,
    ) -> RepositoryResult<Option<Schedule>> {
        let event_id = schedule.event_id.value();
        let own_id = schedule.id.map(|id| id.value());
        let published = schedule.published;
        self.with_conn(move |conn| {
            let mut query = schedules::table
                .filter(schedules::event_id.eq(event_id))
                .filter(schedules::published.is_not_null())
                .select(ScheduleRow::as_select())
                .into_boxed();
            if let Some(own_id) = own_id {
                query = query.filter(schedules::schedule_id.ne(own_id));
            }
            if let Some(published) = published {
                query = query.filter(schedules::published.lt(published));
            }
            let row: Option<ScheduleRow> = query
                .order(schedules::published.desc())
                .first::<ScheduleRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            Ok(row.map(Schedule::from))
        })
        .await
    }

    async fn slots_for_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> RepositoryResult<Vec<TalkSlot>> {
        self.with_conn(move |conn| {
            let exists: i64 = schedules::table
                .filter(schedules::schedule_id.eq(schedule_id.value()))
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            if exists == 0 {
                return Err(RepositoryError::not_found_with_context(
                    format!("Schedule {} does not exist", schedule_id),
                    ErrorContext::new("slots_for_schedule")
                        .with_entity("schedule")
                        .with_entity_id(schedule_id),
                ));
            }
            let rows = load_slots(conn, schedule_id.value())?;
            Ok(rows.into_iter().map(TalkSlot::from).collect())
        })
        .await
    }

    async fn upsert_slot(&self, slot: &TalkSlot) -> RepositoryResult<TalkSlot> {
        if let (Some(start), Some(end)) = (slot.start, slot.end) {
            if end < start {
                return Err(RepositoryError::validation(
                    "Slot must not end before it starts",
                ));
            }
        }

        let slot = slot.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let schedule: Option<ScheduleRow> = schedules::table
                    .find(slot.schedule_id.value())
                    .select(ScheduleRow::as_select())
                    .first::<ScheduleRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?;
                let schedule = schedule.ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("Schedule {} does not exist", slot.schedule_id),
                        ErrorContext::new("upsert_slot")
                            .with_entity("schedule")
                            .with_entity_id(slot.schedule_id),
                    )
                })?;
                if schedule.version.is_some() {
                    return Err(RepositoryError::validation_with_context(
                        "Released schedules are immutable",
                        ErrorContext::new("upsert_slot")
                            .with_entity("schedule")
                            .with_entity_id(slot.schedule_id),
                    ));
                }

                let row: TalkSlotRow = match slot.id {
                    Some(id) => diesel::update(talk_slots::table.find(id.value()))
                        .set((
                            talk_slots::submission_code.eq(slot.submission_code.clone()),
                            talk_slots::description.eq(slot.description.clone()),
                            talk_slots::room_id.eq(slot.room.map(|r| r.value())),
                            talk_slots::start_time.eq(slot.start),
                            talk_slots::end_time.eq(slot.end),
                            talk_slots::is_visible.eq(slot.is_visible),
                        ))
                        .returning(TalkSlotRow::as_returning())
                        .get_result(tx)
                        .optional()
                        .map_err(map_diesel_error)?
                        .ok_or_else(|| {
                            RepositoryError::not_found_with_context(
                                format!("Slot {} does not exist", id),
                                ErrorContext::new("upsert_slot")
                                    .with_entity("talk_slot")
                                    .with_entity_id(id),
                            )
                        })?,
                    None => diesel::insert_into(talk_slots::table)
                        .values(NewTalkSlotRow::copy_of(&slot, slot.schedule_id.value()))
                        .returning(TalkSlotRow::as_returning())
                        .get_result(tx)
                        .map_err(map_diesel_error)?,
                };
                Ok(TalkSlot::from(row))
            })
        })
        .await
    }

    async fn delete_slot(&self, slot_id: TalkSlotId) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let row: Option<TalkSlotRow> = talk_slots::table
                    .find(slot_id.value())
                    .select(TalkSlotRow::as_select())
                    .first::<TalkSlotRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?;
                let row = row.ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        format!("Slot {} does not exist", slot_id),
                        ErrorContext::new("delete_slot")
                            .with_entity("talk_slot")
                            .with_entity_id(slot_id),
                    )
                })?;

                let is_wip: i64 = schedules::table
                    .filter(schedules::schedule_id.eq(row.schedule_id))
                    .filter(schedules::version.is_null())
                    .count()
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                if is_wip == 0 {
                    return Err(RepositoryError::validation_with_context(
                        "Released schedules are immutable",
                        ErrorContext::new("delete_slot")
                            .with_entity("schedule")
                            .with_entity_id(row.schedule_id),
                    ));
                }

                diesel::delete(talk_slots::table.find(slot_id.value()))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                Ok(())
            })
        })
        .await
    }

    async fn freeze_wip_schedule(
        &self,
        event_id: EventId,
        version: &str,
        comment: Option<&str>,
        published: DateTime<Utc>,
    ) -> RepositoryResult<(Schedule, Schedule)> {
        let version = version.to_string();
        let comment = comment.map(str::to_string);
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                load_event(tx, event_id.value())?;
                if find_released_by_version(tx, event_id.value(), &version)?.is_some() {
                    return Err(RepositoryError::validation_with_context(
                        format!("Version \"{}\" is already in use for this event", version),
                        ErrorContext::new("freeze_wip_schedule")
                            .with_entity("schedule")
                            .with_details(format!("version={}", version)),
                    ));
                }
                let wip = load_wip_schedule(tx, event_id.value())?.ok_or_else(|| {
                    RepositoryError::internal_with_context(
                        format!("Event {} has no work-in-progress schedule", event_id),
                        ErrorContext::new("freeze_wip_schedule").with_entity("schedule"),
                    )
                })?;

                let released: ScheduleRow = diesel::update(schedules::table.find(wip.schedule_id))
                    .set((
                        schedules::version.eq(Some(version.clone())),
                        schedules::comment.eq(comment.clone()),
                        schedules::published.eq(Some(published)),
                    ))
                    .returning(ScheduleRow::as_returning())
                    .get_result(tx)
                    .map_err(map_diesel_error)?;

                // Visibility at release time: a slot appears in the public
                // agenda once it is fully scheduled.
                diesel::update(
                    talk_slots::table.filter(talk_slots::schedule_id.eq(released.schedule_id)),
                )
                .set(talk_slots::is_visible.eq(false))
                .execute(tx)
                .map_err(map_diesel_error)?;
                diesel::update(
                    talk_slots::table
                        .filter(talk_slots::schedule_id.eq(released.schedule_id))
                        .filter(talk_slots::start_time.is_not_null())
                        .filter(talk_slots::room_id.is_not_null()),
                )
                .set(talk_slots::is_visible.eq(true))
                .execute(tx)
                .map_err(map_diesel_error)?;

                let new_wip = insert_wip_schedule(tx, event_id.value())?;

                let released_slots = load_slots(tx, released.schedule_id)?;
                let copies: Vec<NewTalkSlotRow> = released_slots
                    .iter()
                    .map(|row| {
                        NewTalkSlotRow::copy_of(&TalkSlot::from(row.clone()), new_wip.schedule_id)
                    })
                    .collect();
                if !copies.is_empty() {
                    diesel::insert_into(talk_slots::table)
                        .values(&copies)
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                Ok((Schedule::from(released), Schedule::from(new_wip)))
            })
        })
        .await
    }

    async fn unfreeze_schedule(
        &self,
        event_id: EventId,
        version: &str,
    ) -> RepositoryResult<(Schedule, Schedule)> {
        let version = version.to_string();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                load_event(tx, event_id.value())?;
                let released = find_released_by_version(tx, event_id.value(), &version)?
                    .ok_or_else(|| {
                        RepositoryError::not_found_with_context(
                            format!(
                                "No schedule version \"{}\" for event {}",
                                version, event_id
                            ),
                            ErrorContext::new("unfreeze_schedule")
                                .with_entity("schedule")
                                .with_details(format!("version={}", version)),
                        )
                    })?;

                let released_slots = load_slots(tx, released.schedule_id)?;
                let released_codes: HashSet<String> = released_slots
                    .iter()
                    .filter_map(|row| row.submission_code.clone())
                    .collect();

                // Slots of the current WIP for submissions the released
                // version did not schedule survive the rollback.
                let old_wip = load_wip_schedule(tx, event_id.value())?;
                let kept_wip_slots: Vec<TalkSlotRow> = match &old_wip {
                    Some(wip) => load_slots(tx, wip.schedule_id)?
                        .into_iter()
                        .filter(|row| match &row.submission_code {
                            Some(code) => !released_codes.contains(code),
                            None => true,
                        })
                        .collect(),
                    None => Vec::new(),
                };

                // The partial unique index allows only one WIP schedule per
                // event, so the old one goes away before its replacement is
                // created.
                if let Some(wip) = &old_wip {
                    diesel::delete(
                        talk_slots::table.filter(talk_slots::schedule_id.eq(wip.schedule_id)),
                    )
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                    diesel::delete(schedules::table.find(wip.schedule_id))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                let new_wip = insert_wip_schedule(tx, event_id.value())?;
                let copies: Vec<NewTalkSlotRow> = released_slots
                    .iter()
                    .chain(kept_wip_slots.iter())
                    .map(|row| {
                        NewTalkSlotRow::copy_of(&TalkSlot::from(row.clone()), new_wip.schedule_id)
                    })
                    .collect();
                if !copies.is_empty() {
                    diesel::insert_into(talk_slots::table)
                        .values(&copies)
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                Ok((Schedule::from(released), Schedule::from(new_wip)))
            })
        })
        .await
    }
}
