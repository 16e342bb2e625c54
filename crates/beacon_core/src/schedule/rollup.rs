//! Activity-level summaries of task dates and costs.

use crate::model::activity::{Activity, ActivityId};
use crate::model::task::Task;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Aggregated view of one activity subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityRollup {
    /// Earliest task start in the subtree.
    pub start: Option<NaiveDate>,
    /// Latest task finish in the subtree.
    pub finish: Option<NaiveDate>,
    pub task_count: usize,
    /// Sum over tasks that carry a budget; `None` when none do.
    pub budget_cents: Option<i64>,
    /// Sum over tasks that carry a spend; `None` when none do.
    pub spent_cents: Option<i64>,
}

/// Summarizes the active tasks under `activity_uuid` and its sub-activities.
pub fn activity_rollup(
    activity_uuid: ActivityId,
    activities: &[Activity],
    tasks: &[Task],
) -> ActivityRollup {
    let subtree = subtree_ids(activity_uuid, activities);
    let mut rollup = ActivityRollup::default();

    for task in tasks
        .iter()
        .filter(|task| task.is_active() && subtree.contains(&task.activity_uuid))
    {
        rollup.task_count += 1;
        rollup.start = min_option(rollup.start, task.start_date);
        rollup.finish = max_option(rollup.finish, task.finish_date);
        rollup.budget_cents = sum_option(rollup.budget_cents, task.budget_cents);
        rollup.spent_cents = sum_option(rollup.spent_cents, task.spent_cents);
    }

    rollup
}

/// Collects `root` plus every active descendant activity.
fn subtree_ids(root: ActivityId, activities: &[Activity]) -> HashSet<ActivityId> {
    let mut ids = HashSet::from([root]);
    let mut frontier = vec![root];
    while let Some(current) = frontier.pop() {
        for child in activities
            .iter()
            .filter(|activity| activity.is_active() && activity.parent_uuid == Some(current))
        {
            if ids.insert(child.uuid) {
                frontier.push(child.uuid);
            }
        }
    }
    ids
}

fn min_option(left: Option<NaiveDate>, right: Option<NaiveDate>) -> Option<NaiveDate> {
    match (left, right) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_option(left: Option<NaiveDate>, right: Option<NaiveDate>) -> Option<NaiveDate> {
    match (left, right) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn sum_option(left: Option<i64>, right: Option<i64>) -> Option<i64> {
    match (left, right) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, b) => a.or(b),
    }
}
