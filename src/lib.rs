//! # confsched
//!
//! Backend for managing versioned conference schedules.
//!
//! This crate tracks events, their talk schedules and resource
//! availabilities, and implements the scheduling workflows conference
//! organizers rely on: releasing immutable schedule versions from a mutable
//! work-in-progress schedule, suggesting the next version name, computing
//! changelogs between releases, and moving whole events in time without
//! breaking relative timing.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Domain types shared by all layers
//! - [`models`]: Pure domain logic (version allocation)
//! - [`db`]: Repository pattern, persistence backends and the service layer
//! - [`services`]: Storage-independent business logic (changelog diffing)
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! ## Storage backends
//!
//! Two repository implementations are provided: an in-memory store for
//! tests and local development (`local-repo` feature, default) and a
//! Diesel/PostgreSQL backend for production (`postgres-repo` feature).
//! Composite operations run atomically in both.

// Allow large error types - RepositoryError carries rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
