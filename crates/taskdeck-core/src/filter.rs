use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::trace;

use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
    Overdue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DueDateSort {
    #[default]
    None,
    Soonest,
    Latest,
}

/// What the list view is currently narrowed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    pub priority: PriorityFilter,
    pub status: StatusFilter,
    pub category: CategoryFilter,
    pub due_date_sort: DueDateSort,
}

/// Narrows `tasks` by search, priority, status and category (in that order)
/// and then applies the due-date ordering. The result borrows from `tasks`
/// and keeps its order unless a due-date sort is requested.
#[tracing::instrument(skip(tasks, criteria, now), fields(total = tasks.len()))]
pub fn apply_filters<'a>(
    tasks: &'a [Task],
    criteria: &FilterCriteria,
    now: DateTime<Utc>,
) -> Vec<&'a Task> {
    let needle = criteria.search.to_lowercase();

    let mut filtered: Vec<&Task> = tasks
        .iter()
        .filter(|task| needle.is_empty() || matches_search(task, &needle))
        .filter(|task| match criteria.priority {
            PriorityFilter::All => true,
            PriorityFilter::Only(priority) => task.priority == priority,
        })
        .filter(|task| match criteria.status {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
            StatusFilter::Overdue => task.is_overdue(now),
        })
        .filter(|task| match &criteria.category {
            CategoryFilter::All => true,
            CategoryFilter::Named(name) => task.category.as_deref() == Some(name.as_str()),
        })
        .collect();

    match criteria.due_date_sort {
        DueDateSort::None => {}
        DueDateSort::Soonest => filtered.sort_by(|a, b| compare_due(a, b, false)),
        DueDateSort::Latest => filtered.sort_by(|a, b| compare_due(a, b, true)),
    }

    trace!(kept = filtered.len(), "applied filters");
    filtered
}

fn matches_search(task: &Task, needle: &str) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(needle);
    contains(&task.title)
        || task.description.as_deref().is_some_and(contains)
        || task.category.as_deref().is_some_and(contains)
}

/// Dated tasks first in the requested direction; undated tasks always last.
fn compare_due(a: &Task, b: &Task, descending: bool) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(a_due), Some(b_due)) => {
            if descending {
                b_due.cmp(&a_due)
            } else {
                a_due.cmp(&b_due)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Distinct non-empty categories across all tasks, sorted.
pub fn categories(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .filter_map(|task| task.category.as_deref())
        .filter(|category| !category.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl FromStr for PriorityFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Priority>().map(Self::Only)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(priority) => write!(f, "{priority}"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "pending" | "open" => Ok(Self::Pending),
            "completed" | "done" => Ok(Self::Completed),
            "overdue" => Ok(Self::Overdue),
            other => Err(anyhow!(
                "invalid status filter: {other} (expected all, pending, completed or overdue)"
            )),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        })
    }
}

impl FromStr for CategoryFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(Self::All)
        } else {
            Ok(Self::Named(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl FromStr for DueDateSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "soonest" | "asc" => Ok(Self::Soonest),
            "latest" | "desc" => Ok(Self::Latest),
            other => Err(anyhow!(
                "invalid due-date sort: {other} (expected none, soonest or latest)"
            )),
        }
    }
}

impl fmt::Display for DueDateSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Soonest => "soonest",
            Self::Latest => "latest",
        })
    }
}
