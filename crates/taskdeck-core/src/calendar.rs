//! Calendar view data: tasks bucketed by the local day they are due.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;

use crate::datetime::{end_of_week, first_of_month, last_of_month, shift_month, start_of_week};
use crate::task::{Priority, Task};

pub const DEFAULT_INDICATOR_CAP: usize = 3;

/// Groups dated tasks by local due day. Each bucket keeps the input order.
pub fn group_by_day<'a>(tasks: &'a [Task], tz: &Tz) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
    let mut days: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(day) = task.due_day(tz) {
            days.entry(day).or_default().push(task);
        }
    }
    days
}

/// Open tasks before completed ones, then high before medium before low.
/// The sort is stable, so ties keep their bucket order.
pub fn order_indicators(bucket: &mut [&Task]) {
    bucket.sort_by_key(|task| (task.completed, task.priority.rank()));
}

/// The markers drawn in one calendar cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayIndicators {
    pub shown: Vec<(Priority, bool)>,
    pub overflow: usize,
}

impl DayIndicators {
    pub fn from_bucket(bucket: &[&Task], cap: usize) -> Self {
        let mut ordered = bucket.to_vec();
        order_indicators(&mut ordered);
        let shown = ordered
            .iter()
            .take(cap)
            .map(|task| (task.priority, task.completed))
            .collect();
        Self {
            shown,
            overflow: bucket.len().saturating_sub(cap),
        }
    }
}

/// Every date from the start of the week holding the 1st through the end of
/// the week holding the last day of `anchor`'s month.
pub fn month_grid(anchor: NaiveDate, week_start: Weekday) -> Vec<NaiveDate> {
    let first = start_of_week(first_of_month(anchor), week_start);
    let last = end_of_week(last_of_month(anchor), week_start);
    first
        .iter_days()
        .take_while(|day| *day <= last)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthSummary {
    pub due: usize,
    pub completed: usize,
    pub high_priority_open: usize,
}

pub fn month_summary(tasks: &[Task], anchor: NaiveDate, tz: &Tz) -> MonthSummary {
    let range = first_of_month(anchor)..=last_of_month(anchor);
    let mut summary = MonthSummary::default();
    for task in tasks {
        let Some(day) = task.due_day(tz) else {
            continue;
        };
        if !range.contains(&day) {
            continue;
        }
        summary.due += 1;
        if task.completed {
            summary.completed += 1;
        } else if task.priority == Priority::High {
            summary.high_priority_open += 1;
        }
    }
    summary
}

/// Tasks due on `today`, in indicator order.
pub fn agenda<'a>(tasks: &'a [Task], today: NaiveDate, tz: &Tz) -> Vec<&'a Task> {
    let mut due: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.due_day(tz) == Some(today))
        .collect();
    order_indicators(&mut due);
    due
}

/// Month navigation state for the calendar surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    first: NaiveDate,
}

impl MonthCursor {
    pub fn new(anchor: NaiveDate) -> Self {
        Self {
            first: first_of_month(anchor),
        }
    }

    pub fn first(&self) -> NaiveDate {
        self.first
    }

    pub fn previous(&self) -> Self {
        self.shift(-1)
    }

    pub fn next(&self) -> Self {
        self.shift(1)
    }

    pub fn shift(&self, months: i32) -> Self {
        Self::new(shift_month(self.first, months))
    }

    pub fn label(&self) -> String {
        self.first.format("%B %Y").to_string()
    }
}
