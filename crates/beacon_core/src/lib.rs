//! Planning core for Cloud Beacon projects.
//!
//! Owns the activity/task work-breakdown model, its SQLite persistence,
//! dependency date propagation and `activity.task` display ids.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config};
pub use model::activity::{Activity, ActivityId, ActivityValidationError};
pub use model::display_id::DisplayId;
pub use model::project::{Project, ProjectId, ProjectKind, ProjectValidationError};
pub use model::task::{Task, TaskId, TaskStatus, TaskValidationError};
pub use repo::common::{EntityKind, RepoError, RepoResult};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::schedule_repo::{NewTask, ScheduleRepository, SqliteScheduleRepository};
pub use schedule::display_ids::{
    display_id_of, resolve_display_id, resolve_display_ids, DisplayIdResolution,
};
pub use schedule::propagate::{propagate_dates, PropagationReport};
pub use schedule::rollup::{activity_rollup, ActivityRollup};
pub use service::project_service::{ProjectDetails, ProjectService, ProjectServiceError};
pub use service::schedule_service::{
    LinkOutcome, PropagationSummary, ScheduleResult, ScheduleService, ScheduleServiceError,
    TaskBoardEntry,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
