//! Display-id lookups over in-memory activity/task snapshots.
//!
//! Lookups are linear scans; a project plan is small enough that indexing
//! would not pay for itself.

use crate::model::activity::{Activity, ActivityId};
use crate::model::display_id::DisplayId;
use crate::model::task::{Task, TaskId};

/// Result of resolving a batch of typed display ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayIdResolution {
    /// Resolved task ids, in input order, without duplicates.
    pub resolved: Vec<TaskId>,
    /// Inputs that were malformed or matched no task, trimmed.
    pub unresolved: Vec<String>,
}

/// Resolves one typed `N.M` value to the matching task id.
///
/// Returns `None` when the input is malformed or no task numbered `M` sits
/// under an activity numbered `N`.
pub fn resolve_display_id(typed: &str, activities: &[Activity], tasks: &[Task]) -> Option<TaskId> {
    let wanted = DisplayId::parse(typed)?;
    tasks
        .iter()
        .filter(|task| task.number == wanted.task)
        .find(|task| activity_number(task.activity_uuid, activities) == Some(wanted.activity))
        .map(|task| task.uuid)
}

/// Resolves many typed values and splits them into hits and misses.
pub fn resolve_display_ids<S: AsRef<str>>(
    typed: &[S],
    activities: &[Activity],
    tasks: &[Task],
) -> DisplayIdResolution {
    let mut resolution = DisplayIdResolution::default();
    for value in typed {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        match resolve_display_id(value, activities, tasks) {
            Some(id) => {
                if !resolution.resolved.contains(&id) {
                    resolution.resolved.push(id);
                }
            }
            None => resolution.unresolved.push(value.to_string()),
        }
    }
    resolution
}

/// Returns the display id of `task`, if its activity is in `activities`.
pub fn display_id_of(task: &Task, activities: &[Activity]) -> Option<DisplayId> {
    activity_number(task.activity_uuid, activities).map(|activity| DisplayId::new(activity, task.number))
}

fn activity_number(activity_uuid: ActivityId, activities: &[Activity]) -> Option<u32> {
    activities
        .iter()
        .find(|activity| activity.uuid == activity_uuid)
        .map(|activity| activity.number)
}
