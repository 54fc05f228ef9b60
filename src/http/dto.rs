//! Request and response types specific to the HTTP API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{Event, Schedule, ScheduleInfo, ShiftReport};

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Response for the health check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Request body for creating an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub slug: String,
    pub name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl From<CreateEventRequest> for Event {
    fn from(request: CreateEventRequest) -> Self {
        Event {
            id: None,
            slug: request.slug,
            name: request.name,
            timezone: request.timezone,
            date_from: request.date_from,
            date_to: request.date_to,
        }
    }
}

/// Response listing the schedules of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    pub schedules: Vec<ScheduleInfo>,
    pub total: usize,
}

/// Response for the version suggestion endpoint.
///
/// `version` is `None` when the previous version has no trailing number to
/// increment; the client has to prompt for manual input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedVersionResponse {
    pub version: Option<String>,
}

/// Request body for releasing the work-in-progress schedule.
///
/// Without an explicit `version`, the suggested next version is used; if no
/// suggestion can be made, the request is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response for a successful release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub released: Schedule,
    pub wip: Schedule,
}

/// Request body for moving an event to a new start date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRequest {
    pub date_from: NaiveDate,
}

/// Response for a successful shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftResponse {
    pub event: Event,
    pub report: ShiftReport,
}
