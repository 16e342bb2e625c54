//! Activity/task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the work-breakdown tree and task dependency edges.
//! - Assign activity and task display numbers at insert time.
//!
//! # Invariants
//! - Activity numbers are `MAX(number) + 1` per project and task numbers are
//!   `MAX(number) + 1` per activity. Tombstoned rows count, so a number is
//!   never handed out twice.
//! - Dependency edges only ever connect active tasks of the same project;
//!   soft-deleting a task drops its edges.
//! - Listing is deterministic: activities by `number`, tasks by activity
//!   number then task number.

use crate::model::activity::{Activity, ActivityId};
use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskId, TaskStatus};
use crate::repo::common::{
    ensure_connection_ready, parse_flag, parse_uuid, EntityKind, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

const ACTIVITY_SELECT_SQL: &str = "SELECT
    activity_uuid,
    project_uuid,
    parent_uuid,
    number,
    name,
    is_deleted
FROM activities";

const TASK_SELECT_SQL: &str = "SELECT
    t.task_uuid AS task_uuid,
    t.project_uuid AS project_uuid,
    t.activity_uuid AS activity_uuid,
    t.number AS number,
    t.name AS name,
    t.start_date AS start_date,
    t.finish_date AS finish_date,
    t.duration_days AS duration_days,
    t.status AS status,
    t.budget_cents AS budget_cents,
    t.spent_cents AS spent_cents,
    t.is_deleted AS is_deleted
FROM tasks t";

/// Insert request for one task. The repository assigns id and number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub project_uuid: ProjectId,
    pub activity_uuid: ActivityId,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub duration_days: u32,
    pub status: TaskStatus,
    pub budget_cents: Option<i64>,
    pub spent_cents: Option<i64>,
}

impl NewTask {
    /// Unscheduled one-day task with no costs.
    pub fn new(project_uuid: ProjectId, activity_uuid: ActivityId, name: impl Into<String>) -> Self {
        Self {
            project_uuid,
            activity_uuid,
            name: name.into(),
            start_date: None,
            duration_days: 1,
            status: TaskStatus::NotStarted,
            budget_cents: None,
            spent_cents: None,
        }
    }
}

/// Repository interface for activity/task planning operations.
pub trait ScheduleRepository {
    /// Returns whether an active project exists.
    fn project_exists(&self, project_uuid: ProjectId) -> RepoResult<bool>;
    /// Creates one activity with the next free project-wide number.
    fn create_activity(
        &self,
        project_uuid: ProjectId,
        parent_uuid: Option<ActivityId>,
        name: &str,
    ) -> RepoResult<Activity>;
    fn get_activity(&self, id: ActivityId, include_deleted: bool)
        -> RepoResult<Option<Activity>>;
    /// Lists active activities of one project ordered by number.
    fn list_activities(&self, project_uuid: ProjectId) -> RepoResult<Vec<Activity>>;
    /// Soft-deletes an activity, its sub-activities and all their tasks.
    fn soft_delete_activity_subtree(&self, id: ActivityId) -> RepoResult<()>;
    /// Creates one task with the next free number inside its activity.
    fn create_task(&self, new_task: &NewTask) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>>;
    /// Lists active tasks of one project with their dependency edges.
    fn list_tasks(&self, project_uuid: ProjectId) -> RepoResult<Vec<Task>>;
    /// Writes start, finish and duration only.
    fn update_task_schedule(&self, task: &Task) -> RepoResult<()>;
    /// Writes name, status and cost fields only.
    fn update_task_details(&self, task: &Task) -> RepoResult<()>;
    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Replaces every predecessor edge of `task_uuid`.
    fn replace_predecessors(&self, task_uuid: TaskId, predecessors: &[TaskId]) -> RepoResult<()>;
    /// Replaces every successor edge of `task_uuid`.
    fn replace_successors(&self, task_uuid: TaskId, successors: &[TaskId]) -> RepoResult<()>;
}

/// SQLite-backed activity/task repository.
pub struct SqliteScheduleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["projects", "activities", "tasks", "task_dependencies"],
        )?;
        Ok(Self { conn })
    }
}

impl ScheduleRepository for SqliteScheduleRepository<'_> {
    fn project_exists(&self, project_uuid: ProjectId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM projects
                WHERE project_uuid = ?1
                  AND is_deleted = 0
            );",
            [project_uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_activity(
        &self,
        project_uuid: ProjectId,
        parent_uuid: Option<ActivityId>,
        name: &str,
    ) -> RepoResult<Activity> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let number: u32 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1
             FROM activities
             WHERE project_uuid = ?1;",
            [project_uuid.to_string()],
            |row| row.get(0),
        )?;

        let activity = Activity::new(project_uuid, parent_uuid, number, name);
        activity.validate()?;
        tx.execute(
            "INSERT INTO activities (
                activity_uuid,
                project_uuid,
                parent_uuid,
                number,
                name,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0);",
            params![
                activity.uuid.to_string(),
                project_uuid.to_string(),
                parent_uuid.map(|value| value.to_string()),
                number,
                activity.name.as_str(),
            ],
        )?;
        tx.commit()?;

        Ok(activity)
    }

    fn get_activity(
        &self,
        id: ActivityId,
        include_deleted: bool,
    ) -> RepoResult<Option<Activity>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACTIVITY_SELECT_SQL}
             WHERE activity_uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_activity_row(row)?));
        }
        Ok(None)
    }

    fn list_activities(&self, project_uuid: ProjectId) -> RepoResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACTIVITY_SELECT_SQL}
             WHERE project_uuid = ?1
               AND is_deleted = 0
             ORDER BY number ASC;"
        ))?;
        let mut rows = stmt.query([project_uuid.to_string()])?;
        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }

    fn soft_delete_activity_subtree(&self, id: ActivityId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_active_activity(&tx, id)?;

        for activity_uuid in list_active_subtree_ids(&tx, id)? {
            let activity_text = activity_uuid.to_string();
            tx.execute(
                "DELETE FROM task_dependencies
                 WHERE task_uuid IN (SELECT task_uuid FROM tasks WHERE activity_uuid = ?1)
                    OR predecessor_uuid IN (SELECT task_uuid FROM tasks WHERE activity_uuid = ?1);",
                [activity_text.as_str()],
            )?;
            tx.execute(
                "UPDATE tasks
                 SET is_deleted = 1,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE activity_uuid = ?1
                   AND is_deleted = 0;",
                [activity_text.as_str()],
            )?;
            tx.execute(
                "UPDATE activities
                 SET is_deleted = 1,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE activity_uuid = ?1
                   AND is_deleted = 0;",
                [activity_text.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn create_task(&self, new_task: &NewTask) -> RepoResult<Task> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let number: u32 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1
             FROM tasks
             WHERE activity_uuid = ?1;",
            [new_task.activity_uuid.to_string()],
            |row| row.get(0),
        )?;

        let mut task = Task::new(
            new_task.project_uuid,
            new_task.activity_uuid,
            number,
            new_task.name.as_str(),
        );
        task.duration_days = new_task.duration_days;
        task.status = new_task.status;
        task.budget_cents = new_task.budget_cents;
        task.spent_cents = new_task.spent_cents;
        if let Some(start) = new_task.start_date {
            task.schedule(start)?;
        }
        task.validate()?;

        tx.execute(
            "INSERT INTO tasks (
                task_uuid,
                project_uuid,
                activity_uuid,
                number,
                name,
                start_date,
                finish_date,
                duration_days,
                status,
                budget_cents,
                spent_cents,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0);",
            params![
                task.uuid.to_string(),
                task.project_uuid.to_string(),
                task.activity_uuid.to_string(),
                task.number,
                task.name.as_str(),
                task.start_date,
                task.finish_date,
                task.duration_days,
                task.status.as_str(),
                task.budget_cents,
                task.spent_cents,
            ],
        )?;
        tx.commit()?;

        Ok(task)
    }

    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE t.task_uuid = ?1
               AND (?2 = 1 OR t.is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), include_deleted])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut task = parse_task_row(row)?;

        task.predecessors = query_ids(
            self.conn,
            "SELECT d.predecessor_uuid
             FROM task_dependencies d
             INNER JOIN tasks p ON p.task_uuid = d.predecessor_uuid
             WHERE d.task_uuid = ?1
               AND p.is_deleted = 0
             ORDER BY d.rowid ASC;",
            id,
            "task_dependencies.predecessor_uuid",
        )?;
        task.successors = query_ids(
            self.conn,
            "SELECT d.task_uuid
             FROM task_dependencies d
             INNER JOIN tasks s ON s.task_uuid = d.task_uuid
             WHERE d.predecessor_uuid = ?1
               AND s.is_deleted = 0
             ORDER BY d.rowid ASC;",
            id,
            "task_dependencies.task_uuid",
        )?;
        Ok(Some(task))
    }

    fn list_tasks(&self, project_uuid: ProjectId) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             INNER JOIN activities a ON a.activity_uuid = t.activity_uuid
             WHERE t.project_uuid = ?1
               AND t.is_deleted = 0
             ORDER BY a.number ASC, t.number ASC;"
        ))?;
        let mut rows = stmt.query([project_uuid.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        let positions: HashMap<TaskId, usize> = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.uuid, position))
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT d.task_uuid, d.predecessor_uuid
             FROM task_dependencies d
             INNER JOIN tasks t ON t.task_uuid = d.task_uuid
             WHERE t.project_uuid = ?1
             ORDER BY d.rowid ASC;",
        )?;
        let mut rows = stmt.query([project_uuid.to_string()])?;
        while let Some(row) = rows.next()? {
            let task_text: String = row.get(0)?;
            let predecessor_text: String = row.get(1)?;
            let task_uuid = parse_uuid(&task_text, "task_dependencies.task_uuid")?;
            let predecessor_uuid =
                parse_uuid(&predecessor_text, "task_dependencies.predecessor_uuid")?;

            // Edges touching tombstoned tasks are dropped on delete; skip any stragglers.
            let (Some(&task_pos), Some(&pred_pos)) =
                (positions.get(&task_uuid), positions.get(&predecessor_uuid))
            else {
                continue;
            };
            tasks[task_pos].predecessors.push(predecessor_uuid);
            tasks[pred_pos].successors.push(task_uuid);
        }

        Ok(tasks)
    }

    fn update_task_schedule(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;
        let changed = self.conn.execute(
            "UPDATE tasks
             SET start_date = ?2,
                 finish_date = ?3,
                 duration_days = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE task_uuid = ?1
               AND is_deleted = 0;",
            params![
                task.uuid.to_string(),
                task.start_date,
                task.finish_date,
                task.duration_days,
            ],
        )?;
        if changed == 0 {
            return Err(task_not_found(task.uuid));
        }
        Ok(())
    }

    fn update_task_details(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;
        let changed = self.conn.execute(
            "UPDATE tasks
             SET name = ?2,
                 status = ?3,
                 budget_cents = ?4,
                 spent_cents = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE task_uuid = ?1
               AND is_deleted = 0;",
            params![
                task.uuid.to_string(),
                task.name.as_str(),
                task.status.as_str(),
                task.budget_cents,
                task.spent_cents,
            ],
        )?;
        if changed == 0 {
            return Err(task_not_found(task.uuid));
        }
        Ok(())
    }

    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE tasks
             SET is_deleted = 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE task_uuid = ?1
               AND is_deleted = 0;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(task_not_found(id));
        }
        tx.execute(
            "DELETE FROM task_dependencies
             WHERE task_uuid = ?1
                OR predecessor_uuid = ?1;",
            [id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn replace_predecessors(&self, task_uuid: TaskId, predecessors: &[TaskId]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let project_uuid = active_task_project(&tx, task_uuid)?;
        ensure_tasks_in_project(&tx, project_uuid, predecessors)?;

        tx.execute(
            "DELETE FROM task_dependencies WHERE task_uuid = ?1;",
            [task_uuid.to_string()],
        )?;
        for predecessor in predecessors {
            tx.execute(
                "INSERT OR IGNORE INTO task_dependencies (task_uuid, predecessor_uuid)
                 VALUES (?1, ?2);",
                params![task_uuid.to_string(), predecessor.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn replace_successors(&self, task_uuid: TaskId, successors: &[TaskId]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let project_uuid = active_task_project(&tx, task_uuid)?;
        ensure_tasks_in_project(&tx, project_uuid, successors)?;

        tx.execute(
            "DELETE FROM task_dependencies WHERE predecessor_uuid = ?1;",
            [task_uuid.to_string()],
        )?;
        for successor in successors {
            tx.execute(
                "INSERT OR IGNORE INTO task_dependencies (task_uuid, predecessor_uuid)
                 VALUES (?1, ?2);",
                params![successor.to_string(), task_uuid.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn ensure_active_activity(conn: &Connection, id: ActivityId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM activities
            WHERE activity_uuid = ?1
              AND is_deleted = 0
        );",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::NotFound {
            kind: EntityKind::Activity,
            id,
        });
    }
    Ok(())
}

fn list_active_subtree_ids(conn: &Connection, root: ActivityId) -> RepoResult<Vec<ActivityId>> {
    query_ids(
        conn,
        "WITH RECURSIVE subtree(activity_uuid) AS (
            SELECT activity_uuid
            FROM activities
            WHERE activity_uuid = ?1
              AND is_deleted = 0
            UNION
            SELECT child.activity_uuid
            FROM activities child
            INNER JOIN subtree parent ON child.parent_uuid = parent.activity_uuid
            WHERE child.is_deleted = 0
        )
        SELECT activity_uuid FROM subtree;",
        root,
        "activities.activity_uuid",
    )
}

fn active_task_project(conn: &Connection, task_uuid: TaskId) -> RepoResult<ProjectId> {
    let project_text: Option<String> = conn
        .query_row(
            "SELECT project_uuid
             FROM tasks
             WHERE task_uuid = ?1
               AND is_deleted = 0;",
            [task_uuid.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match project_text {
        Some(value) => parse_uuid(&value, "tasks.project_uuid"),
        None => Err(task_not_found(task_uuid)),
    }
}

fn ensure_tasks_in_project(
    conn: &Connection,
    project_uuid: ProjectId,
    task_ids: &[TaskId],
) -> RepoResult<()> {
    for task_uuid in task_ids {
        let matches: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM tasks
                WHERE task_uuid = ?1
                  AND project_uuid = ?2
                  AND is_deleted = 0
            );",
            params![task_uuid.to_string(), project_uuid.to_string()],
            |row| row.get(0),
        )?;
        if matches != 1 {
            return Err(task_not_found(*task_uuid));
        }
    }
    Ok(())
}

fn query_ids(
    conn: &Connection,
    sql: &str,
    id: Uuid,
    column: &'static str,
) -> RepoResult<Vec<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, column)?);
    }
    Ok(ids)
}

fn task_not_found(id: TaskId) -> RepoError {
    RepoError::NotFound {
        kind: EntityKind::Task,
        id,
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let uuid_text: String = row.get("activity_uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let parent_uuid = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "activities.parent_uuid"))
        .transpose()?;

    let activity = Activity {
        uuid: parse_uuid(&uuid_text, "activities.activity_uuid")?,
        project_uuid: parse_uuid(&project_text, "activities.project_uuid")?,
        parent_uuid,
        number: row.get("number")?,
        name: row.get("name")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "activities.is_deleted")?,
    };
    activity.validate()?;
    Ok(activity)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("task_uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let activity_text: String = row.get("activity_uuid")?;
    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    let task = Task {
        uuid: parse_uuid(&uuid_text, "tasks.task_uuid")?,
        project_uuid: parse_uuid(&project_text, "tasks.project_uuid")?,
        activity_uuid: parse_uuid(&activity_text, "tasks.activity_uuid")?,
        number: row.get("number")?,
        name: row.get("name")?,
        start_date: row.get("start_date")?,
        finish_date: row.get("finish_date")?,
        duration_days: row.get("duration_days")?,
        status,
        predecessors: Vec::new(),
        successors: Vec::new(),
        budget_cents: row.get("budget_cents")?,
        spent_cents: row.get("spent_cents")?,
        is_deleted: parse_flag(row.get("is_deleted")?, "tasks.is_deleted")?,
    };
    task.validate()?;
    Ok(task)
}
