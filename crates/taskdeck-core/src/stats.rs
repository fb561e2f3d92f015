//! Dashboard numbers derived from the full task collection.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use crate::datetime::{end_of_week, local_date, start_of_week};
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bucket {
    pub total: usize,
    pub completed: usize,
}

impl Bucket {
    /// Completed share in percent; 0 for an empty bucket.
    pub fn ratio(&self) -> f64 {
        ratio(self.completed, self.total)
    }

    fn add(&mut self, task: &Task) {
        self.total += 1;
        if task.completed {
            self.completed += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub completion_rate: f64,
    pub today: Bucket,
    pub this_week: Bucket,
    pub overdue: usize,
    pub high_priority_open: usize,
    pub streak: u32,
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Rounded percentage for display, e.g. `67%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", value.round() as i64)
}

pub fn completion_rate(tasks: &[Task]) -> f64 {
    let completed = tasks.iter().filter(|task| task.completed).count();
    ratio(completed, tasks.len())
}

#[tracing::instrument(skip(tasks, now, tz), fields(total = tasks.len()))]
pub fn compute(
    tasks: &[Task],
    now: DateTime<Utc>,
    tz: &Tz,
    week_start: Weekday,
) -> DashboardStats {
    let today = local_date(now, tz);
    let week_first = start_of_week(today, week_start);
    let week_last = end_of_week(today, week_start);

    let mut stats = DashboardStats {
        total: tasks.len(),
        completion_rate: completion_rate(tasks),
        ..DashboardStats::default()
    };

    for task in tasks {
        if task.completed {
            stats.completed += 1;
        } else {
            stats.pending += 1;
            if task.priority == Priority::High {
                stats.high_priority_open += 1;
            }
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }
        if let Some(due) = task.due_day(tz) {
            if due == today {
                stats.today.add(task);
            }
            if (week_first..=week_last).contains(&due) {
                stats.this_week.add(task);
            }
        }
    }

    stats.streak = streak(tasks, today, tz);
    tracing::debug!(
        completed = stats.completed,
        overdue = stats.overdue,
        streak = stats.streak,
        "computed dashboard stats"
    );
    stats
}

/// Consecutive days, counting back from `today`, on which at least one task
/// was completed. A completed task counts for the local day of its last
/// update. Today and yesterday may be empty without ending the run; any
/// earlier empty day does.
pub fn streak(tasks: &[Task], today: NaiveDate, tz: &Tz) -> u32 {
    let active: BTreeSet<NaiveDate> = tasks
        .iter()
        .filter(|task| task.completed)
        .map(|task| task.updated_day(tz))
        .collect();

    let yesterday = today - Duration::days(1);
    let mut day = today;
    let mut count = 0;
    loop {
        if active.contains(&day) {
            count += 1;
        } else if day != today && day != yesterday {
            break;
        }
        day -= Duration::days(1);
    }
    count
}
