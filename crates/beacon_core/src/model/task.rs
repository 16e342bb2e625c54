//! Task domain model.
//!
//! # Responsibility
//! - Define the schedulable unit of work and its status lifecycle.
//! - Own the start/finish/duration date arithmetic.
//!
//! # Invariants
//! - `duration_days >= 1`.
//! - When both dates are set, `finish_date == start_date + (duration_days - 1)`
//!   after any call to [`Task::schedule`].
//! - `finish_date` is never earlier than `start_date`.
//! - `predecessors` and `successors` are two views over one stored edge set.

use crate::model::activity::ActivityId;
use crate::model::project::ProjectId;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable task identifier.
pub type TaskId = Uuid;

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Complete,
    OnHold,
}

impl TaskStatus {
    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::OnHold => "on_hold",
        }
    }

    /// Parses a storage/wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "complete" => Some(Self::Complete),
            "on_hold" => Some(Self::OnHold),
            _ => None,
        }
    }
}

/// Validation failures for [`Task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NilUuid,
    BlankName,
    ZeroNumber,
    ZeroDuration,
    /// `finish_date` is earlier than `start_date`.
    InvalidDateWindow { start: NaiveDate, finish: NaiveDate },
    /// Date arithmetic left the supported calendar range.
    DateOutOfRange,
    NegativeCost { field: &'static str, value: i64 },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "task uuid must not be nil"),
            Self::BlankName => write!(f, "task name must not be blank"),
            Self::ZeroNumber => write!(f, "task number must be positive"),
            Self::ZeroDuration => write!(f, "task duration must be at least one day"),
            Self::InvalidDateWindow { start, finish } => write!(
                f,
                "finish_date ({finish}) must be >= start_date ({start})"
            ),
            Self::DateOutOfRange => write!(f, "task dates are out of the supported range"),
            Self::NegativeCost { field, value } => {
                write!(f, "{field} must not be negative, got {value}")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Schedulable unit of work inside an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: TaskId,
    pub project_uuid: ProjectId,
    pub activity_uuid: ActivityId,
    /// Display number within the activity, the `M` of `N.M`.
    pub number: u32,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub finish_date: Option<NaiveDate>,
    pub duration_days: u32,
    pub status: TaskStatus,
    /// Tasks that must finish before this one starts.
    #[serde(default)]
    pub predecessors: Vec<TaskId>,
    /// Tasks that wait on this one.
    #[serde(default)]
    pub successors: Vec<TaskId>,
    pub budget_cents: Option<i64>,
    pub spent_cents: Option<i64>,
    pub is_deleted: bool,
}

impl Task {
    /// Creates an unscheduled one-day task with a generated stable ID.
    pub fn new(
        project_uuid: ProjectId,
        activity_uuid: ActivityId,
        number: u32,
        name: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            activity_uuid,
            number,
            name: name.into(),
            start_date: None,
            finish_date: None,
            duration_days: 1,
            status: TaskStatus::NotStarted,
            predecessors: Vec::new(),
            successors: Vec::new(),
            budget_cents: None,
            spent_cents: None,
            is_deleted: false,
        }
    }

    /// Returns the inclusive finish date of a task starting at `start`.
    ///
    /// A one-day task finishes on the day it starts. Returns `None` only when
    /// the result falls outside the calendar range chrono supports.
    pub fn finish_for(start: NaiveDate, duration_days: u32) -> Option<NaiveDate> {
        start.checked_add_days(Days::new(u64::from(duration_days.saturating_sub(1))))
    }

    /// Sets the start date and recomputes the finish date from duration.
    pub fn schedule(&mut self, start: NaiveDate) -> Result<(), TaskValidationError> {
        let finish =
            Self::finish_for(start, self.duration_days).ok_or(TaskValidationError::DateOutOfRange)?;
        self.start_date = Some(start);
        self.finish_date = Some(finish);
        Ok(())
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.uuid.is_nil() {
            return Err(TaskValidationError::NilUuid);
        }
        if self.name.trim().is_empty() {
            return Err(TaskValidationError::BlankName);
        }
        if self.number == 0 {
            return Err(TaskValidationError::ZeroNumber);
        }
        if self.duration_days == 0 {
            return Err(TaskValidationError::ZeroDuration);
        }
        if let (Some(start), Some(finish)) = (self.start_date, self.finish_date) {
            if finish < start {
                return Err(TaskValidationError::InvalidDateWindow { start, finish });
            }
        }
        for (field, value) in [
            ("budget_cents", self.budget_cents),
            ("spent_cents", self.spent_cents),
        ] {
            if let Some(value) = value {
                if value < 0 {
                    return Err(TaskValidationError::NegativeCost { field, value });
                }
            }
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
