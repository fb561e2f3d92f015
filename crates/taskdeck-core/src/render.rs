use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{DayIndicators, MonthCursor, MonthSummary};
use crate::config::Config;
use crate::datetime::format_local;
use crate::stats::{DashboardStats, format_percent};
use crate::task::{Priority, Task};

const CELL_WIDTH: usize = 10;

/// Everything the calendar surface draws for one month.
#[derive(Debug, Clone)]
pub struct CalendarView<'a> {
    pub cursor: MonthCursor,
    pub grid: Vec<NaiveDate>,
    pub days: BTreeMap<NaiveDate, Vec<&'a Task>>,
    pub today: NaiveDate,
    pub week_start: Weekday,
    pub indicator_cap: usize,
    pub summary: MonthSummary,
    pub agenda: Vec<&'a Task>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
}

impl Renderer {
    pub fn new(cfg: &Config, tz: Tz) -> Self {
        Self {
            color: cfg.color() && io::stdout().is_terminal(),
            tz,
        }
    }

    pub fn plain(tz: Tz) -> Self {
        Self { color: false, tz }
    }

    #[tracing::instrument(skip(self, tasks, now), fields(count = tasks.len()))]
    pub fn print_task_table(&self, tasks: &[&Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks, now)
    }

    pub fn write_task_table<W: Write>(
        &self,
        mut out: W,
        tasks: &[&Task],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let done = if task.completed { "x" } else { " " }.to_string();
            let due = task
                .due_date
                .map(|due| format_local(due, &self.tz))
                .unwrap_or_default();
            let due = if task.is_overdue(now) {
                self.paint(&due, "31")
            } else {
                due
            };

            rows.push(vec![
                self.paint(&task.short_id(), "33"),
                done,
                self.paint(task.priority.as_str(), priority_color(task.priority)),
                due,
                task.category.clone().unwrap_or_default(),
                task.title.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        writeln!(out)?;
        writeln!(
            out,
            "{} task{}",
            tasks.len(),
            if tasks.len() == 1 { "" } else { "s" }
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, now), fields(id = %task.id))]
    pub fn print_task_info(&self, task: &Task, now: DateTime<Utc>) -> anyhow::Result<()> {
        self.write_task_info(io::stdout().lock(), task, now)
    }

    pub fn write_task_info<W: Write>(
        &self,
        mut out: W,
        task: &Task,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let status = if task.completed {
            "completed"
        } else if task.is_overdue(now) {
            "overdue"
        } else {
            "pending"
        };

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(out, "status      {status}")?;
        writeln!(out, "priority    {}", task.priority)?;
        if let Some(description) = &task.description {
            writeln!(out, "description {description}")?;
        }
        if let Some(category) = &task.category {
            writeln!(out, "category    {category}")?;
        }
        if let Some(due) = task.due_date {
            writeln!(out, "due         {}", format_local(due, &self.tz))?;
        }
        writeln!(out, "created     {}", format_local(task.created_at, &self.tz))?;
        writeln!(out, "updated     {}", format_local(task.updated_at, &self.tz))?;
        Ok(())
    }

    pub fn print_categories(&self, categories: &[String]) -> anyhow::Result<()> {
        self.write_categories(io::stdout().lock(), categories)
    }

    pub fn write_categories<W: Write>(&self, mut out: W, categories: &[String]) -> anyhow::Result<()> {
        if categories.is_empty() {
            writeln!(out, "No categories.")?;
        }
        for category in categories {
            writeln!(out, "{category}")?;
        }
        Ok(())
    }

    pub fn print_dashboard(&self, stats: &DashboardStats) -> anyhow::Result<()> {
        self.write_dashboard(io::stdout().lock(), stats)
    }

    pub fn write_dashboard<W: Write>(&self, mut out: W, stats: &DashboardStats) -> anyhow::Result<()> {
        let rows = vec![
            ("Total", stats.total.to_string()),
            (
                "Completed",
                format!(
                    "{} ({})",
                    stats.completed,
                    format_percent(stats.completion_rate)
                ),
            ),
            ("Pending", stats.pending.to_string()),
            (
                "Due today",
                format!(
                    "{}/{} ({})",
                    stats.today.completed,
                    stats.today.total,
                    format_percent(stats.today.ratio())
                ),
            ),
            (
                "This week",
                format!(
                    "{}/{} ({})",
                    stats.this_week.completed,
                    stats.this_week.total,
                    format_percent(stats.this_week.ratio())
                ),
            ),
            ("Overdue", self.paint_if(stats.overdue > 0, stats.overdue.to_string(), "31")),
            ("High priority", stats.high_priority_open.to_string()),
            (
                "Streak",
                format!(
                    "{} day{}",
                    stats.streak,
                    if stats.streak == 1 { "" } else { "s" }
                ),
            ),
        ];

        let label_width = rows
            .iter()
            .map(|(label, _)| UnicodeWidthStr::width(*label))
            .max()
            .unwrap_or(0);
        for (label, value) in rows {
            writeln!(out, "{label:<label_width$}  {value}")?;
        }
        Ok(())
    }

    pub fn print_calendar(&self, view: &CalendarView<'_>) -> anyhow::Result<()> {
        self.write_calendar(io::stdout().lock(), view)
    }

    pub fn write_calendar<W: Write>(&self, mut out: W, view: &CalendarView<'_>) -> anyhow::Result<()> {
        let month = view.cursor.first().month();
        writeln!(out, "{}", view.cursor.label())?;

        let mut weekday = view.week_start;
        for _ in 0..7 {
            write!(out, "{:<width$}", weekday_label(weekday), width = CELL_WIDTH)?;
            weekday = weekday.succ();
        }
        writeln!(out)?;

        for week in view.grid.chunks(7) {
            for day in week {
                let number = format!(
                    "{:>2}{}",
                    day.day(),
                    if *day == view.today { "*" } else { " " }
                );
                let marks = view
                    .days
                    .get(day)
                    .map(|bucket| indicator_marks(&DayIndicators::from_bucket(bucket, view.indicator_cap)))
                    .unwrap_or_default();
                let cell = format!("{number}{marks}");
                let visible = UnicodeWidthStr::width(cell.as_str());
                let cell = if day.month() != month {
                    self.paint(&cell, "2")
                } else if *day == view.today {
                    self.paint(&cell, "1")
                } else {
                    cell
                };
                write!(out, "{cell}{}", " ".repeat(CELL_WIDTH.saturating_sub(visible)))?;
            }
            writeln!(out)?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "Tasks this month: {}  Completed: {}  High priority open: {}",
            view.summary.due, view.summary.completed, view.summary.high_priority_open
        )?;

        writeln!(out)?;
        writeln!(out, "Today ({})", view.today.format("%a %b %-d"))?;
        if view.agenda.is_empty() {
            writeln!(out, "  nothing due")?;
        }
        for task in &view.agenda {
            writeln!(
                out,
                "  [{}] {:<6} {}",
                if task.completed { "x" } else { " " },
                task.priority.as_str(),
                task.title
            )?;
        }
        Ok(())
    }

    fn paint_if(&self, condition: bool, text: String, code: &str) -> String {
        if condition { self.paint(&text, code) } else { text }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// One letter per shown task (upper case while open) plus `+N` overflow.
fn indicator_marks(indicators: &DayIndicators) -> String {
    let mut marks: String = indicators
        .shown
        .iter()
        .map(|(priority, completed)| {
            let letter = match priority {
                Priority::High => 'H',
                Priority::Medium => 'M',
                Priority::Low => 'L',
            };
            if *completed {
                letter.to_ascii_lowercase()
            } else {
                letter
            }
        })
        .collect();
    if indicators.overflow > 0 {
        marks.push_str(&format!("+{}", indicators.overflow));
    }
    marks
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_cells: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| format!("{header:width$}"))
        .collect();
    write_line(&mut writer, &header_cells)?;

    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    write_line(&mut writer, &separator)?;

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                let padding = width.saturating_sub(visible_width);
                format!("{}{}", cell, " ".repeat(padding))
            })
            .collect();
        write_line(&mut writer, &cells)?;
    }

    Ok(())
}

/// Joins padded cells with single spaces; the last column carries no padding.
fn write_line<W: Write>(writer: &mut W, cells: &[String]) -> anyhow::Result<()> {
    let line = cells.join(" ");
    writeln!(writer, "{}", line.trim_end_matches(' '))?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday};
    use uuid::Uuid;

    use super::{CalendarView, Renderer, strip_ansi};
    use crate::calendar::{MonthCursor, agenda, group_by_day, month_grid, month_summary};
    use crate::stats::compute;
    use crate::task::{Priority, Task};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 11, 15, 0, 0)
            .single()
            .expect("valid now")
    }

    fn task(title: &str, priority: Priority, due: Option<DateTime<Utc>>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            completed: false,
            priority,
            due_date: due,
            category: Some("Work".to_string()),
            created_at: now(),
            updated_at: now(),
            owner: "ana".to_string(),
        }
    }

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut buf = Vec::new();
        write(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn task_table_lists_rows_and_count() {
        let renderer = Renderer::plain(chrono_tz::UTC);
        let tasks = [task("Écrire le rapport", Priority::High, Some(now()))];
        let refs: Vec<&Task> = tasks.iter().collect();

        let text = render(|buf| renderer.write_task_table(buf, &refs, now()));
        assert!(text.contains("Écrire le rapport"));
        assert!(text.contains("2026-03-11 15:00"));
        assert!(text.contains(&tasks[0].short_id()));
        assert!(text.trim_end().ends_with("1 task"));
    }

    #[test]
    fn table_lines_have_no_trailing_spaces() {
        let renderer = Renderer::plain(chrono_tz::UTC);
        let tasks = [
            task("Short", Priority::Low, None),
            task("A much longer title", Priority::High, Some(now())),
        ];
        let refs: Vec<&Task> = tasks.iter().collect();

        let text = render(|buf| renderer.write_task_table(buf, &refs, now()));
        assert!(text.lines().count() > 3);
        for line in text.lines() {
            assert!(!line.ends_with(' '), "trailing space in {line:?}");
        }
    }

    #[test]
    fn empty_table_says_so() {
        let renderer = Renderer::plain(chrono_tz::UTC);
        let text = render(|buf| renderer.write_task_table(buf, &[], now()));
        assert_eq!(text, "No tasks found.\n");
    }

    #[test]
    fn dashboard_shows_rates_and_streak() {
        let renderer = Renderer::plain(chrono_tz::UTC);
        let mut done = task("done", Priority::Low, None);
        done.completed = true;
        let tasks = vec![done, task("open", Priority::High, None)];
        let stats = compute(&tasks, now(), &chrono_tz::UTC, Weekday::Sun);

        let text = render(|buf| renderer.write_dashboard(buf, &stats));
        assert!(text.contains("Completed      1 (50%)"));
        assert!(text.contains("High priority  1"));
        assert!(text.contains("Streak         1 day\n"));
    }

    #[test]
    fn calendar_marks_days_with_indicators() {
        let renderer = Renderer::plain(chrono_tz::UTC);
        let due = Some(now());
        let tasks = vec![
            task("a", Priority::Low, due),
            task("b", Priority::High, due),
            task("c", Priority::Medium, due),
            task("d", Priority::Medium, due),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 3, 11).expect("date");
        let view = CalendarView {
            cursor: MonthCursor::new(today),
            grid: month_grid(today, Weekday::Sun),
            days: group_by_day(&tasks, &chrono_tz::UTC),
            today,
            week_start: Weekday::Sun,
            indicator_cap: 3,
            summary: month_summary(&tasks, today, &chrono_tz::UTC),
            agenda: agenda(&tasks, today, &chrono_tz::UTC),
        };

        let text = render(|buf| renderer.write_calendar(buf, &view));
        assert!(text.starts_with("March 2026\nSun"));
        assert!(text.contains("11*HMM+1"));
        assert!(text.contains("Tasks this month: 4"));
        assert!(text.contains("[ ] high   b"));
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }
}
