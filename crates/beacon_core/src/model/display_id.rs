//! Human-facing `activity.task` identifier.
//!
//! Users see and type `N.M` instead of task UUIDs. `N` is the activity
//! number inside the project, `M` is the task number inside that activity.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Parsed `N.M` display identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayId {
    pub activity: u32,
    pub task: u32,
}

impl DisplayId {
    pub fn new(activity: u32, task: u32) -> Self {
        Self { activity, task }
    }

    /// Parses user input such as `"2.1"` or `" 2.1 "`.
    ///
    /// Returns `None` for anything that is not two positive integers joined
    /// by one dot.
    pub fn parse(value: &str) -> Option<Self> {
        let (activity, task) = value.trim().split_once('.')?;
        let activity = parse_positive(activity)?;
        let task = parse_positive(task)?;
        Some(Self { activity, task })
    }
}

impl Display for DisplayId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.activity, self.task)
    }
}

fn parse_positive(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<u32>().ok().filter(|number| *number > 0)
}
