//! High-level business logic shared by the repository service layer, the
//! HTTP handlers and the admin CLI.

pub mod changes;

pub use changes::{calculate_changes, MovedTalk, ScheduleAction, ScheduleChanges};
