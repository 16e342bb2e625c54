//! Project planning domain model.
//!
//! # Responsibility
//! - Define canonical project, activity and task records.
//! - Define the human-facing `activity.task` display identifier.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//! - Activity and task numbers are assigned once and never reassigned.

pub mod activity;
pub mod display_id;
pub mod project;
pub mod task;
