//! Activity domain model.
//!
//! # Invariants
//! - `parent_uuid` links form a tree inside one project.
//! - `number` is unique within the project, including tombstoned rows.

use crate::model::project::ProjectId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable activity identifier.
pub type ActivityId = Uuid;

/// Validation failures for [`Activity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityValidationError {
    NilUuid,
    BlankName,
    ZeroNumber,
    SelfParent,
}

impl Display for ActivityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "activity uuid must not be nil"),
            Self::BlankName => write!(f, "activity name must not be blank"),
            Self::ZeroNumber => write!(f, "activity number must be positive"),
            Self::SelfParent => write!(f, "activity cannot be its own parent"),
        }
    }
}

impl Error for ActivityValidationError {}

/// Grouping node in a project's work-breakdown tree.
///
/// Child tasks and sub-activities are not stored here; they point back to
/// their activity through `activity_uuid` / `parent_uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub uuid: ActivityId,
    pub project_uuid: ProjectId,
    /// `None` means top-level activity.
    pub parent_uuid: Option<ActivityId>,
    /// Display number, the `N` of `N.M`.
    pub number: u32,
    pub name: String,
    pub is_deleted: bool,
}

impl Activity {
    pub fn new(
        project_uuid: ProjectId,
        parent_uuid: Option<ActivityId>,
        number: u32,
        name: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            project_uuid,
            parent_uuid,
            number,
            name: name.into(),
            is_deleted: false,
        }
    }

    pub fn validate(&self) -> Result<(), ActivityValidationError> {
        if self.uuid.is_nil() {
            return Err(ActivityValidationError::NilUuid);
        }
        if self.name.trim().is_empty() {
            return Err(ActivityValidationError::BlankName);
        }
        if self.number == 0 {
            return Err(ActivityValidationError::ZeroNumber);
        }
        if self.parent_uuid == Some(self.uuid) {
            return Err(ActivityValidationError::SelfParent);
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}
