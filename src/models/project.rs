use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// A project as served by the `projects/` query endpoint.
///
/// Dates are kept as the raw strings the server sent; `view` parses them
/// when building display rows so that a malformed value only degrades its
/// own label.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub display_photo: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub task_counts: TaskCounts,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total_tasks: u32,
    pub completed_tasks: u32,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub username: String,
}

/// Narrows the query to completed, incomplete, or all projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionFilter {
    #[default]
    Any,
    Completed,
    Incomplete,
}

impl CompletionFilter {
    /// Value sent as the `completed` query parameter.
    pub fn query_value(self) -> &'static str {
        match self {
            CompletionFilter::Any => "",
            CompletionFilter::Completed => "true",
            CompletionFilter::Incomplete => "false",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CompletionFilter::Any => "All",
            CompletionFilter::Completed => "Completed",
            CompletionFilter::Incomplete => "Incomplete",
        }
    }

    pub fn next(self) -> Self {
        match self {
            CompletionFilter::Any => CompletionFilter::Completed,
            CompletionFilter::Completed => CompletionFilter::Incomplete,
            CompletionFilter::Incomplete => CompletionFilter::Any,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            CompletionFilter::Any => CompletionFilter::Incomplete,
            CompletionFilter::Completed => CompletionFilter::Any,
            CompletionFilter::Incomplete => CompletionFilter::Completed,
        }
    }
}

impl FromStr for CompletionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(CompletionFilter::Any),
            "true" | "completed" => Ok(CompletionFilter::Completed),
            "false" | "incomplete" => Ok(CompletionFilter::Incomplete),
            other => Err(format!("unknown completion filter '{other}'")),
        }
    }
}

impl fmt::Display for CompletionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
