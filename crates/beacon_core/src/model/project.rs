//! Project domain model.
//!
//! A project is the container for one work-breakdown tree. Feed, voting and
//! team membership live outside this crate; only the planning shape is kept.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable project identifier.
pub type ProjectId = Uuid;

/// Kind of initiative a project represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    /// Build or repair something in the physical world.
    Physical,
    /// Invent or prototype something new.
    Inventive,
    /// Organize people around a local cause.
    Community,
    /// Campaign for or against a piece of legislation.
    Legislative,
}

impl ProjectKind {
    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Inventive => "inventive",
            Self::Community => "community",
            Self::Legislative => "legislative",
        }
    }

    /// Parses a storage/wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "physical" => Some(Self::Physical),
            "inventive" => Some(Self::Inventive),
            "community" => Some(Self::Community),
            "legislative" => Some(Self::Legislative),
            _ => None,
        }
    }
}

/// Validation failures for [`Project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    NilUuid,
    BlankTitle,
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "project uuid must not be nil"),
            Self::BlankTitle => write!(f, "project title must not be blank"),
        }
    }
}

impl Error for ProjectValidationError {}

/// Canonical project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub uuid: ProjectId,
    pub kind: ProjectKind,
    pub title: String,
    pub description: Option<String>,
    /// Opaque owner handle issued by the identity provider.
    pub owner: Option<String>,
    pub is_deleted: bool,
}

impl Project {
    /// Creates a new project with a generated stable ID.
    pub fn new(kind: ProjectKind, title: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            title: title.into(),
            description: None,
            owner: None,
            is_deleted: false,
        }
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.uuid.is_nil() {
            return Err(ProjectValidationError::NilUuid);
        }
        if self.title.trim().is_empty() {
            return Err(ProjectValidationError::BlankTitle);
        }
        Ok(())
    }
}
