//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the service
//! layer for business logic.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::dto::{
    CreateEventRequest, HealthResponse, ReleaseRequest, ReleaseResponse, ScheduleListResponse,
    ShiftRequest, ShiftResponse, SuggestedVersionResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{Event, EventId, ScheduleId, TalkSlot};
use crate::db::services as db_services;
use crate::services::changes::ScheduleChanges;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

async fn resolve_event(state: &AppState, slug: &str) -> Result<(Event, EventId), AppError> {
    let event = db_services::get_event_by_slug(state.repository.as_ref(), slug).await?;
    let id = event
        .id
        .ok_or_else(|| AppError::Internal("Stored event is missing its primary key".into()))?;
    Ok((event, id))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the database
/// is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Events
// =============================================================================

/// GET /v1/events
pub async fn list_events(State(state): State<AppState>) -> HandlerResult<Vec<Event>> {
    let events = db_services::list_events(state.repository.as_ref()).await?;
    Ok(Json(events))
}

/// POST /v1/events
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = db_services::create_event(state.repository.as_ref(), &request.into()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /v1/events/{slug}
pub async fn get_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HandlerResult<Event> {
    let (event, _) = resolve_event(&state, &slug).await?;
    Ok(Json(event))
}

/// POST /v1/events/{slug}/shift
///
/// Move the event (and everything scheduled within it) to a new start date.
pub async fn shift_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<ShiftRequest>,
) -> HandlerResult<ShiftResponse> {
    let (_, event_id) = resolve_event(&state, &slug).await?;
    let report =
        db_services::shift_event(state.repository.as_ref(), event_id, request.date_from).await?;
    let event = db_services::get_event(state.repository.as_ref(), event_id).await?;
    Ok(Json(ShiftResponse { event, report }))
}

// =============================================================================
// Schedules
// =============================================================================

/// GET /v1/events/{slug}/schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HandlerResult<ScheduleListResponse> {
    let (_, event_id) = resolve_event(&state, &slug).await?;
    let schedules = db_services::list_schedules(state.repository.as_ref(), event_id).await?;
    let total = schedules.len();
    Ok(Json(ScheduleListResponse { schedules, total }))
}

/// GET /v1/events/{slug}/schedules/suggest-version
pub async fn suggest_version(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HandlerResult<SuggestedVersionResponse> {
    let (_, event_id) = resolve_event(&state, &slug).await?;
    let suggestion = db_services::suggest_version(state.repository.as_ref(), event_id).await?;
    Ok(Json(SuggestedVersionResponse {
        version: (!suggestion.is_empty()).then_some(suggestion),
    }))
}

/// POST /v1/events/{slug}/schedules/release
///
/// Release the work-in-progress schedule. Uses the suggested version when
/// the request does not name one.
pub async fn release_schedule(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<ReleaseRequest>,
) -> HandlerResult<ReleaseResponse> {
    let (_, event_id) = resolve_event(&state, &slug).await?;

    let version = match request.version {
        Some(version) => version,
        None => {
            let suggestion =
                db_services::suggest_version(state.repository.as_ref(), event_id).await?;
            if suggestion.is_empty() {
                return Err(AppError::BadRequest(
                    "The next version cannot be guessed from the previous one; \
                     provide a version explicitly"
                        .into(),
                ));
            }
            suggestion
        }
    };

    let (released, wip) = db_services::release_schedule(
        state.repository.as_ref(),
        event_id,
        &version,
        request.comment.as_deref(),
    )
    .await?;
    Ok(Json(ReleaseResponse { released, wip }))
}

/// GET /v1/schedules/{schedule_id}
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> HandlerResult<crate::api::Schedule> {
    let schedule =
        db_services::get_schedule(state.repository.as_ref(), ScheduleId::new(schedule_id))
            .await?;
    Ok(Json(schedule))
}

/// GET /v1/schedules/{schedule_id}/slots
pub async fn get_schedule_slots(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> HandlerResult<Vec<TalkSlot>> {
    let slots =
        db_services::schedule_slots(state.repository.as_ref(), ScheduleId::new(schedule_id))
            .await?;
    Ok(Json(slots))
}

/// GET /v1/schedules/{schedule_id}/changes
///
/// The changelog of a schedule against the release before it.
pub async fn get_schedule_changes(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> HandlerResult<ScheduleChanges> {
    let changes = db_services::schedule_changes(
        state.repository.as_ref(),
        ScheduleId::new(schedule_id),
    )
    .await?;
    Ok(Json(changes))
}
