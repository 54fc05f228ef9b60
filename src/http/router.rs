//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the API router with versioned endpoints
    let api_v1 = Router::new()
        // Events
        .route("/events", get(handlers::list_events))
        .route("/events", post(handlers::create_event))
        .route("/events/{slug}", get(handlers::get_event))
        .route("/events/{slug}/shift", post(handlers::shift_event))
        // Schedules
        .route("/events/{slug}/schedules", get(handlers::list_schedules))
        .route(
            "/events/{slug}/schedules/suggest-version",
            get(handlers::suggest_version),
        )
        .route(
            "/events/{slug}/schedules/release",
            post(handlers::release_schedule),
        )
        .route("/schedules/{schedule_id}", get(handlers::get_schedule))
        .route(
            "/schedules/{schedule_id}/slots",
            get(handlers::get_schedule_slots),
        )
        .route(
            "/schedules/{schedule_id}/changes",
            get(handlers::get_schedule_changes),
        );

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo =
            Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        let state = AppState::new(repo);
        let _router = create_router(state);
        // If we got here, router was created successfully
    }
}
