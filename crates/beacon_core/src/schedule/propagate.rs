//! Forward date propagation along task dependencies.
//!
//! # Contract
//! - Tasks are ordered with Kahn's algorithm over predecessor edges, seeded
//!   in input order so results are deterministic.
//! - A task with predecessors must start at least one day after the latest
//!   finish date among those predecessors that have one.
//! - Dates only move later. A task already scheduled later than required is
//!   left untouched.
//! - Tasks that never reach in-degree zero (cycles, self references, and
//!   anything downstream of them) are excluded and reported.

use crate::model::task::{Task, TaskId};
use chrono::Days;
use log::warn;
use std::collections::{HashMap, HashSet, VecDeque};

/// Outcome of one propagation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Tasks whose start/finish dates were moved, in topological order.
    pub changed: Vec<TaskId>,
    /// Tasks left out of the topological order, in input order.
    pub excluded: Vec<TaskId>,
}

impl PropagationReport {
    /// Returns whether any task was modified.
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Returns whether the dependency graph contained a cycle.
    pub fn has_cycles(&self) -> bool {
        !self.excluded.is_empty()
    }
}

/// Propagates start/finish dates through `tasks` in place.
///
/// Predecessor ids that do not name a task in `tasks` are ignored, as are
/// duplicate edges. Tasks whose predecessors have no finish date are skipped
/// until the next invocation.
pub fn propagate_dates(tasks: &mut [Task]) -> PropagationReport {
    let mut report = PropagationReport::default();
    if tasks.is_empty() {
        return report;
    }

    let index: HashMap<TaskId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(position, task)| (task.uuid, position))
        .collect();

    let predecessors: Vec<Vec<usize>> = tasks
        .iter()
        .map(|task| {
            let mut seen = HashSet::new();
            task.predecessors
                .iter()
                .filter_map(|id| index.get(id).copied())
                .filter(|position| seen.insert(*position))
                .collect()
        })
        .collect();

    let order = topological_order(&predecessors);

    let mut ordered = vec![false; tasks.len()];
    for &position in &order {
        ordered[position] = true;
    }
    report.excluded = tasks
        .iter()
        .zip(&ordered)
        .filter(|(_, is_ordered)| !**is_ordered)
        .map(|(task, _)| task.uuid)
        .collect();

    for &position in &order {
        let preds = &predecessors[position];
        if preds.is_empty() {
            continue;
        }

        let Some(latest_finish) = preds
            .iter()
            .filter_map(|&pred| tasks[pred].finish_date)
            .max()
        else {
            continue;
        };
        let Some(required_start) = latest_finish.checked_add_days(Days::new(1)) else {
            continue;
        };

        let task = &mut tasks[position];
        if task
            .start_date
            .is_some_and(|current| current >= required_start)
        {
            continue;
        }

        match task.schedule(required_start) {
            Ok(()) => report.changed.push(task.uuid),
            Err(err) => warn!(
                "event=schedule_propagate module=schedule status=skipped task_uuid={} error={}",
                task.uuid, err
            ),
        }
    }

    report
}

/// Kahn's algorithm over `predecessors[i]` adjacency.
///
/// Returns the positions that reach in-degree zero, in processing order.
fn topological_order(predecessors: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = predecessors.iter().map(Vec::len).collect();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); predecessors.len()];
    for (position, preds) in predecessors.iter().enumerate() {
        for &pred in preds {
            successors[pred].push(position);
        }
    }

    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(position, _)| position)
        .collect();
    let mut order = Vec::with_capacity(predecessors.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    order
}
