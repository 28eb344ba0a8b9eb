use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::Task;

/// Which tasks a view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    /// Every task.
    #[default]
    All,
    /// Only completed tasks.
    Completed,
    /// Only tasks still open.
    NotCompleted,
}

impl FilterMode {
    /// Every mode, in menu order.
    pub const ALL_MODES: [Self; 3] = [Self::All, Self::Completed, Self::NotCompleted];

    /// Whether `task` is visible under this mode.
    #[must_use]
    pub const fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.completed,
            Self::NotCompleted => !task.completed,
        }
    }

    /// Keep the visible tasks, preserving their relative order.
    #[must_use]
    pub fn apply(self, tasks: &[Task]) -> Vec<Task> {
        tasks
            .iter()
            .filter(|task| self.matches(task))
            .cloned()
            .collect()
    }

    /// Next mode in menu order, wrapping around.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::All => Self::Completed,
            Self::Completed => Self::NotCompleted,
            Self::NotCompleted => Self::All,
        }
    }

    /// Stable token used on the command line and in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Completed => "completed",
            Self::NotCompleted => "not-completed",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Completed => "Completed",
            Self::NotCompleted => "Not Completed",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown filter token.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown filter '{token}' (expected all, completed or not-completed)")]
pub struct FilterParseError {
    /// Token as supplied.
    pub token: String,
}

impl FromStr for FilterMode {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::Completed),
            "not-completed" | "notcompleted" | "open" => Ok(Self::NotCompleted),
            _ => Err(FilterParseError {
                token: s.to_owned(),
            }),
        }
    }
}
