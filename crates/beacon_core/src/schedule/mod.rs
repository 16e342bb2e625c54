//! Pure scheduling algorithms over in-memory project snapshots.
//!
//! # Responsibility
//! - Forward-propagate task dates along predecessor edges.
//! - Translate between task UUIDs and `activity.task` display ids.
//! - Roll task dates and costs up to activities.
//!
//! # Invariants
//! - Functions here never touch storage; callers persist the results.
//! - Cyclic input never panics and is reported, not repaired.

pub mod display_ids;
pub mod propagate;
pub mod rollup;
