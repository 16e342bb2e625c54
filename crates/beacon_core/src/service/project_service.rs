//! Project use-case service.

use crate::model::project::{Project, ProjectId, ProjectKind};
use crate::repo::common::{EntityKind, RepoError};
use crate::repo::project_repo::ProjectRepository;
use crate::service::normalize_label;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from project service operations.
#[derive(Debug)]
pub enum ProjectServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    ProjectNotFound(ProjectId),
    Repo(RepoError),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "project title must not be blank"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                kind: EntityKind::Project,
                id,
            } => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Optional fields for [`ProjectService::create_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDetails {
    pub description: Option<String>,
    pub owner: Option<String>,
}

/// Project service facade.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one project. Blank descriptions are stored as `None`.
    pub fn create_project(
        &self,
        kind: ProjectKind,
        title: impl Into<String>,
        details: ProjectDetails,
    ) -> Result<Project, ProjectServiceError> {
        let title = normalize_label(title.into()).ok_or(ProjectServiceError::InvalidTitle)?;
        let mut project = Project::new(kind, title);
        project.description = details.description.and_then(normalize_label);
        project.owner = details.owner.and_then(normalize_label);

        self.repo.create_project(&project)?;
        info!(
            "event=project_create module=service status=ok project_uuid={} kind={}",
            project.uuid,
            kind.as_str()
        );
        Ok(project)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project, ProjectServiceError> {
        self.repo
            .get_project(id, false)?
            .ok_or(ProjectServiceError::ProjectNotFound(id))
    }

    /// Lists active projects, newest first, optionally filtered by kind.
    pub fn list_projects(
        &self,
        kind: Option<ProjectKind>,
    ) -> Result<Vec<Project>, ProjectServiceError> {
        self.repo.list_projects(kind).map_err(Into::into)
    }

    pub fn delete_project(&self, id: ProjectId) -> Result<(), ProjectServiceError> {
        self.repo.soft_delete_project(id)?;
        info!("event=project_delete module=service status=ok project_uuid={id}");
        Ok(())
    }
}
