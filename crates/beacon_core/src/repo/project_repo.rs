//! Project repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Project::validate()` before SQL mutations.
//! - Listing is deterministic: `created_at DESC, project_uuid ASC`.

use crate::model::project::{Project, ProjectId, ProjectKind};
use crate::repo::common::{
    ensure_connection_ready, parse_flag, parse_uuid, EntityKind, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    project_uuid,
    kind,
    title,
    description,
    owner,
    is_deleted
FROM projects";

/// Repository interface for project CRUD operations.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId, include_deleted: bool) -> RepoResult<Option<Project>>;
    fn list_projects(&self, kind: Option<ProjectKind>) -> RepoResult<Vec<Project>>;
    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["projects"])?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                project_uuid,
                kind,
                title,
                description,
                owner,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                project.uuid.to_string(),
                project.kind.as_str(),
                project.title.as_str(),
                project.description.as_deref(),
                project.owner.as_deref(),
                project.is_deleted,
            ],
        )?;

        Ok(project.uuid)
    }

    fn get_project(&self, id: ProjectId, include_deleted: bool) -> RepoResult<Option<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE project_uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }

        Ok(None)
    }

    fn list_projects(&self, kind: Option<ProjectKind>) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE is_deleted = 0
               AND (?1 IS NULL OR kind = ?1)
             ORDER BY created_at DESC, project_uuid ASC;"
        ))?;

        let mut rows = stmt.query([kind.map(ProjectKind::as_str)])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }

        Ok(projects)
    }

    fn soft_delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE project_uuid = ?1
               AND is_deleted = 0;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: EntityKind::Project,
                id,
            });
        }

        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("project_uuid")?;
    let kind_text: String = row.get("kind")?;
    let kind = ProjectKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid project kind `{kind_text}` in projects.kind"))
    })?;

    let project = Project {
        uuid: parse_uuid(&uuid_text, "projects.project_uuid")?,
        kind,
        title: row.get("title")?,
        description: row.get("description")?,
        owner: row.get("owner")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "projects.is_deleted")?,
    };
    project.validate()?;
    Ok(project)
}
