//! Work-breakdown and scheduling use-case service.
//!
//! # Responsibility
//! - Validate tree and ownership rules above the repository layer.
//! - Resolve typed `N.M` ids into dependency edges.
//! - Run date propagation after every schedule-affecting edit and persist
//!   each moved task with one update call.
//!
//! # Invariants
//! - Parent activities belong to the same project as their children.
//! - Dependency edges never point outside the task's project.
//! - Unresolvable typed ids are dropped and reported, never persisted.
//! - Nothing is written under a soft-deleted project; the project check
//!   runs before the first write of every mutation.

use crate::model::activity::{Activity, ActivityId};
use crate::model::display_id::DisplayId;
use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskId, TaskStatus, TaskValidationError};
use crate::repo::common::{EntityKind, RepoError};
use crate::repo::schedule_repo::{NewTask, ScheduleRepository};
use crate::schedule::display_ids::{display_id_of, resolve_display_id, resolve_display_ids};
use crate::schedule::propagate::propagate_dates;
use crate::schedule::rollup::{activity_rollup, ActivityRollup};
use crate::service::normalize_label;
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from schedule service operations.
#[derive(Debug)]
pub enum ScheduleServiceError {
    /// Activity or task name is blank after trim.
    InvalidName,
    ProjectNotFound(ProjectId),
    ActivityNotFound(ActivityId),
    TaskNotFound(TaskId),
    /// Parent activity does not exist or is soft-deleted.
    ParentNotFound(ActivityId),
    /// Referenced activity belongs to another project.
    ActivityOutsideProject {
        activity_uuid: ActivityId,
        project_uuid: ProjectId,
    },
    /// Date arithmetic or field validation failed before persistence.
    Validation(TaskValidationError),
    Repo(RepoError),
}

impl Display for ScheduleServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "name must not be blank"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::ActivityNotFound(id) => write!(f, "activity not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent activity not found: {id}"),
            Self::ActivityOutsideProject {
                activity_uuid,
                project_uuid,
            } => write!(
                f,
                "activity {activity_uuid} does not belong to project {project_uuid}"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScheduleServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ScheduleServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => match kind {
                EntityKind::Project => Self::ProjectNotFound(id),
                EntityKind::Activity => Self::ActivityNotFound(id),
                EntityKind::Task => Self::TaskNotFound(id),
            },
            RepoError::TaskValidation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<TaskValidationError> for ScheduleServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleServiceError>;

/// Persisted outcome of one propagation pass over a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationSummary {
    /// Tasks whose dates were moved and written back.
    pub changed: Vec<TaskId>,
    /// Tasks skipped because they sit on or behind a dependency cycle.
    pub excluded: Vec<TaskId>,
    /// `excluded` rendered as display ids for user-facing warnings.
    pub excluded_display_ids: Vec<DisplayId>,
}

impl PropagationSummary {
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Outcome of replacing a task's predecessor or successor list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Task ids now linked, in typed order.
    pub linked: Vec<TaskId>,
    /// Typed values that matched no task and were dropped.
    pub unresolved: Vec<String>,
    pub propagation: PropagationSummary,
}

/// One row of a project's task board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBoardEntry {
    pub display_id: DisplayId,
    pub task: Task,
    pub predecessor_ids: Vec<DisplayId>,
    pub successor_ids: Vec<DisplayId>,
}

#[derive(Clone, Copy)]
enum LinkDirection {
    Predecessors,
    Successors,
}

/// Schedule service facade.
pub struct ScheduleService<R: ScheduleRepository> {
    repo: R,
}

impl<R: ScheduleRepository> ScheduleService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an activity numbered after every activity the project ever had.
    pub fn add_activity(
        &self,
        project_uuid: ProjectId,
        parent_uuid: Option<ActivityId>,
        name: impl Into<String>,
    ) -> ScheduleResult<Activity> {
        let name = normalize_label(name.into()).ok_or(ScheduleServiceError::InvalidName)?;
        self.ensure_project(project_uuid)?;
        if let Some(parent_uuid) = parent_uuid {
            let parent = self
                .repo
                .get_activity(parent_uuid, false)?
                .ok_or(ScheduleServiceError::ParentNotFound(parent_uuid))?;
            ensure_same_project(&parent, project_uuid)?;
        }

        let activity = self
            .repo
            .create_activity(project_uuid, parent_uuid, name.as_str())?;
        info!(
            "event=activity_create module=service status=ok project_uuid={} activity_uuid={} number={}",
            project_uuid, activity.uuid, activity.number
        );
        Ok(activity)
    }

    /// Creates a task numbered after every task its activity ever had.
    ///
    /// The finish date is derived from start and duration.
    pub fn add_task(&self, mut new_task: NewTask) -> ScheduleResult<Task> {
        new_task.name =
            normalize_label(new_task.name).ok_or(ScheduleServiceError::InvalidName)?;
        let activity = self.require_activity(new_task.activity_uuid)?;
        ensure_same_project(&activity, new_task.project_uuid)?;
        self.ensure_project(new_task.project_uuid)?;

        let task = self.repo.create_task(&new_task)?;
        info!(
            "event=task_create module=service status=ok project_uuid={} task_uuid={} display_id={}",
            task.project_uuid,
            task.uuid,
            DisplayId::new(activity.number, task.number)
        );
        Ok(task)
    }

    /// Replaces the predecessors of `task_uuid` from typed `N.M` values, then
    /// propagates dates across the project.
    pub fn set_predecessors<S: AsRef<str>>(
        &self,
        task_uuid: TaskId,
        typed: &[S],
    ) -> ScheduleResult<LinkOutcome> {
        self.set_links(task_uuid, typed, LinkDirection::Predecessors)
    }

    /// Replaces the successors of `task_uuid` from typed `N.M` values, then
    /// propagates dates across the project.
    pub fn set_successors<S: AsRef<str>>(
        &self,
        task_uuid: TaskId,
        typed: &[S],
    ) -> ScheduleResult<LinkOutcome> {
        self.set_links(task_uuid, typed, LinkDirection::Successors)
    }

    /// Moves a task to `start` with a new duration, then propagates.
    ///
    /// A start earlier than the predecessors allow is pushed forward again
    /// by the propagation pass.
    pub fn reschedule_task(
        &self,
        task_uuid: TaskId,
        start: NaiveDate,
        duration_days: u32,
    ) -> ScheduleResult<PropagationSummary> {
        let mut task = self.require_editable_task(task_uuid)?;
        if duration_days == 0 {
            return Err(TaskValidationError::ZeroDuration.into());
        }
        task.duration_days = duration_days;
        task.schedule(start)?;
        self.repo.update_task_schedule(&task)?;
        self.propagate(task.project_uuid)
    }

    pub fn update_task_status(&self, task_uuid: TaskId, status: TaskStatus) -> ScheduleResult<Task> {
        let mut task = self.require_editable_task(task_uuid)?;
        task.status = status;
        self.repo.update_task_details(&task)?;
        Ok(task)
    }

    pub fn update_task_costs(
        &self,
        task_uuid: TaskId,
        budget_cents: Option<i64>,
        spent_cents: Option<i64>,
    ) -> ScheduleResult<Task> {
        let mut task = self.require_editable_task(task_uuid)?;
        task.budget_cents = budget_cents;
        task.spent_cents = spent_cents;
        self.repo.update_task_details(&task)?;
        Ok(task)
    }

    pub fn rename_task(&self, task_uuid: TaskId, name: impl Into<String>) -> ScheduleResult<Task> {
        let name = normalize_label(name.into()).ok_or(ScheduleServiceError::InvalidName)?;
        let mut task = self.require_editable_task(task_uuid)?;
        task.name = name;
        self.repo.update_task_details(&task)?;
        Ok(task)
    }

    /// Soft-deletes a task and drops its dependency edges.
    pub fn delete_task(&self, task_uuid: TaskId) -> ScheduleResult<()> {
        self.require_editable_task(task_uuid)?;
        self.repo.soft_delete_task(task_uuid)?;
        info!("event=task_delete module=service status=ok task_uuid={task_uuid}");
        Ok(())
    }

    /// Soft-deletes an activity with its sub-activities and their tasks.
    pub fn delete_activity(&self, activity_uuid: ActivityId) -> ScheduleResult<()> {
        let activity = self.require_activity(activity_uuid)?;
        self.ensure_project(activity.project_uuid)?;
        self.repo.soft_delete_activity_subtree(activity_uuid)?;
        info!("event=activity_delete module=service status=ok activity_uuid={activity_uuid}");
        Ok(())
    }

    /// Runs date propagation over every active task of a project.
    ///
    /// Each moved task is written back with one `update_task_schedule` call.
    /// Tasks on a dependency cycle are left alone and logged as a warning.
    pub fn propagate(&self, project_uuid: ProjectId) -> ScheduleResult<PropagationSummary> {
        self.ensure_project(project_uuid)?;
        let activities = self.repo.list_activities(project_uuid)?;
        let mut tasks = self.repo.list_tasks(project_uuid)?;

        let report = propagate_dates(&mut tasks);
        for changed in &report.changed {
            if let Some(task) = tasks.iter().find(|task| task.uuid == *changed) {
                self.repo.update_task_schedule(task)?;
            }
        }

        let excluded_display_ids: Vec<DisplayId> = report
            .excluded
            .iter()
            .filter_map(|id| tasks.iter().find(|task| task.uuid == *id))
            .filter_map(|task| display_id_of(task, &activities))
            .collect();
        if report.has_cycles() {
            warn!(
                "event=schedule_propagate module=service status=cycle project_uuid={} excluded={}",
                project_uuid,
                join_display_ids(&excluded_display_ids)
            );
        }
        info!(
            "event=schedule_propagate module=service status=ok project_uuid={} tasks={} changed={} excluded={}",
            project_uuid,
            tasks.len(),
            report.changed.len(),
            report.excluded.len()
        );

        Ok(PropagationSummary {
            changed: report.changed,
            excluded: report.excluded,
            excluded_display_ids,
        })
    }

    /// Returns the `N.M` id of a task.
    pub fn display_id(&self, task_uuid: TaskId) -> ScheduleResult<DisplayId> {
        let task = self.require_task(task_uuid)?;
        let activity = self
            .repo
            .get_activity(task.activity_uuid, true)?
            .ok_or(ScheduleServiceError::ActivityNotFound(task.activity_uuid))?;
        Ok(DisplayId::new(activity.number, task.number))
    }

    /// Resolves a typed `N.M` value inside one project.
    pub fn resolve(&self, project_uuid: ProjectId, typed: &str) -> ScheduleResult<Option<TaskId>> {
        self.ensure_project(project_uuid)?;
        let activities = self.repo.list_activities(project_uuid)?;
        let tasks = self.repo.list_tasks(project_uuid)?;
        Ok(resolve_display_id(typed, &activities, &tasks))
    }

    /// Summarizes dates and costs of an activity subtree.
    pub fn activity_rollup(&self, activity_uuid: ActivityId) -> ScheduleResult<ActivityRollup> {
        let activity = self.require_activity(activity_uuid)?;
        let activities = self.repo.list_activities(activity.project_uuid)?;
        let tasks = self.repo.list_tasks(activity.project_uuid)?;
        Ok(activity_rollup(activity_uuid, &activities, &tasks))
    }

    /// Lists active tasks of a project with their display ids, sorted by id.
    pub fn task_board(&self, project_uuid: ProjectId) -> ScheduleResult<Vec<TaskBoardEntry>> {
        self.ensure_project(project_uuid)?;
        let activities = self.repo.list_activities(project_uuid)?;
        let tasks = self.repo.list_tasks(project_uuid)?;

        let to_display_ids = |ids: &[TaskId]| -> Vec<DisplayId> {
            ids.iter()
                .filter_map(|id| tasks.iter().find(|task| task.uuid == *id))
                .filter_map(|task| display_id_of(task, &activities))
                .collect()
        };

        let mut board: Vec<TaskBoardEntry> = tasks
            .iter()
            .filter_map(|task| {
                let display_id = display_id_of(task, &activities)?;
                Some(TaskBoardEntry {
                    display_id,
                    predecessor_ids: to_display_ids(&task.predecessors),
                    successor_ids: to_display_ids(&task.successors),
                    task: task.clone(),
                })
            })
            .collect();
        board.sort_by_key(|entry| entry.display_id);
        Ok(board)
    }

    fn set_links<S: AsRef<str>>(
        &self,
        task_uuid: TaskId,
        typed: &[S],
        direction: LinkDirection,
    ) -> ScheduleResult<LinkOutcome> {
        let task = self.require_editable_task(task_uuid)?;
        let activities = self.repo.list_activities(task.project_uuid)?;
        let tasks = self.repo.list_tasks(task.project_uuid)?;

        let resolution = resolve_display_ids(typed, &activities, &tasks);
        if !resolution.unresolved.is_empty() {
            warn!(
                "event=task_link module=service status=partial task_uuid={} unresolved={}",
                task_uuid,
                resolution.unresolved.join(",")
            );
        }

        match direction {
            LinkDirection::Predecessors => {
                self.repo.replace_predecessors(task_uuid, &resolution.resolved)?
            }
            LinkDirection::Successors => {
                self.repo.replace_successors(task_uuid, &resolution.resolved)?
            }
        }

        let propagation = self.propagate(task.project_uuid)?;
        Ok(LinkOutcome {
            linked: resolution.resolved,
            unresolved: resolution.unresolved,
            propagation,
        })
    }

    fn ensure_project(&self, project_uuid: ProjectId) -> ScheduleResult<()> {
        if !self.repo.project_exists(project_uuid)? {
            return Err(ScheduleServiceError::ProjectNotFound(project_uuid));
        }
        Ok(())
    }

    fn require_activity(&self, activity_uuid: ActivityId) -> ScheduleResult<Activity> {
        self.repo
            .get_activity(activity_uuid, false)?
            .ok_or(ScheduleServiceError::ActivityNotFound(activity_uuid))
    }

    fn require_task(&self, task_uuid: TaskId) -> ScheduleResult<Task> {
        self.repo
            .get_task(task_uuid, false)?
            .ok_or(ScheduleServiceError::TaskNotFound(task_uuid))
    }

    /// Loads a task for mutation. Tasks of a deleted project are read-only.
    fn require_editable_task(&self, task_uuid: TaskId) -> ScheduleResult<Task> {
        let task = self.require_task(task_uuid)?;
        self.ensure_project(task.project_uuid)?;
        Ok(task)
    }
}

fn ensure_same_project(activity: &Activity, project_uuid: ProjectId) -> ScheduleResult<()> {
    if activity.project_uuid != project_uuid {
        return Err(ScheduleServiceError::ActivityOutsideProject {
            activity_uuid: activity.uuid,
            project_uuid,
        });
    }
    Ok(())
}

fn join_display_ids(ids: &[DisplayId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
