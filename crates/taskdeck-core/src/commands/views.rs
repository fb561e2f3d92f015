use tracing::{debug, info, instrument};

use super::{CommandContext, load_tasks, resolve_id};
use crate::calendar::{MonthCursor, agenda, group_by_day, month_grid, month_summary};
use crate::cli::{CalendarArgs, ListArgs};
use crate::datetime::{local_date, parse_month};
use crate::filter::{FilterCriteria, apply_filters, categories};
use crate::render::CalendarView;
use crate::service::TaskService;
use crate::stats;
use crate::store::TaskStore;

/// Builds list criteria from flags, falling back to `list.sort` for ordering.
pub fn criteria_from_args(
    args: &ListArgs,
    ctx: &CommandContext<'_>,
) -> anyhow::Result<FilterCriteria> {
    Ok(FilterCriteria {
        search: args.search.clone().unwrap_or_default(),
        priority: args
            .priority
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default(),
        status: args
            .status
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default(),
        category: args
            .category
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default(),
        due_date_sort: match args.sort.as_deref() {
            Some(raw) => raw.parse()?,
            None => ctx.cfg.list_sort()?,
        },
    })
}

#[instrument(skip(store, ctx, args))]
pub fn cmd_list<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
    args: &ListArgs,
) -> anyhow::Result<()> {
    info!("command list");

    let criteria = criteria_from_args(args, ctx)?;
    load_tasks(store, ctx.sink)?;

    let visible = apply_filters(store.tasks(), &criteria, ctx.now);
    debug!(
        total = store.tasks().len(),
        shown = visible.len(),
        ?criteria,
        "filtered task list"
    );
    ctx.renderer.print_task_table(&visible, ctx.now)
}

#[instrument(skip(store, ctx))]
pub fn cmd_show<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
    id: &str,
) -> anyhow::Result<()> {
    load_tasks(store, ctx.sink)?;
    let id = resolve_id(store.tasks(), id)?;
    match store.get(id) {
        Some(task) => ctx.renderer.print_task_info(task, ctx.now),
        None => Err(anyhow::anyhow!("no task matches id {id}")),
    }
}

#[instrument(skip(store, ctx))]
pub fn cmd_categories<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
) -> anyhow::Result<()> {
    load_tasks(store, ctx.sink)?;
    ctx.renderer.print_categories(&categories(store.tasks()))
}

#[instrument(skip(store, ctx))]
pub fn cmd_dashboard<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
) -> anyhow::Result<()> {
    info!("command dashboard");

    let week_start = ctx.cfg.week_start()?;
    load_tasks(store, ctx.sink)?;
    let stats = stats::compute(store.tasks(), ctx.now, &ctx.tz, week_start);
    ctx.renderer.print_dashboard(&stats)
}

#[instrument(skip(store, ctx, args))]
pub fn cmd_calendar<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
    args: &CalendarArgs,
) -> anyhow::Result<()> {
    info!("command calendar");

    let week_start = ctx.cfg.week_start()?;
    let indicator_cap = ctx.cfg.indicator_cap()?;
    let today = local_date(ctx.now, &ctx.tz);
    let anchor = match args.month.as_deref() {
        Some(raw) => parse_month(raw)?,
        None => today,
    };
    let cursor = MonthCursor::new(anchor).shift(args.month_offset());
    debug!(month = %cursor.first(), "resolved calendar month");

    load_tasks(store, ctx.sink)?;
    let tasks = store.tasks();
    let view = CalendarView {
        cursor,
        grid: month_grid(cursor.first(), week_start),
        days: group_by_day(tasks, &ctx.tz),
        today,
        week_start,
        indicator_cap,
        summary: month_summary(tasks, cursor.first(), &ctx.tz),
        agenda: agenda(tasks, today, &ctx.tz),
    };
    ctx.renderer.print_calendar(&view)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::criteria_from_args;
    use crate::cli::ListArgs;
    use crate::commands::CommandContext;
    use crate::config::Config;
    use crate::filter::{DueDateSort, PriorityFilter, StatusFilter};
    use crate::notice::SilentSink;
    use crate::render::Renderer;
    use crate::task::Priority;

    #[test]
    fn list_flags_override_configured_sort() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("list.sort".to_string(), "latest".to_string())]);
        let renderer = Renderer::plain(chrono_tz::UTC);
        let mut sink = SilentSink;
        let ctx = CommandContext {
            cfg: &cfg,
            renderer: &renderer,
            sink: &mut sink,
            tz: chrono_tz::UTC,
            now: Utc::now(),
        };

        let from_config = criteria_from_args(&ListArgs::default(), &ctx).expect("criteria");
        assert_eq!(from_config.due_date_sort, DueDateSort::Latest);

        let args = ListArgs {
            priority: Some("high".to_string()),
            status: Some("pending".to_string()),
            sort: Some("soonest".to_string()),
            ..ListArgs::default()
        };
        let criteria = criteria_from_args(&args, &ctx).expect("criteria");
        assert_eq!(criteria.priority, PriorityFilter::Only(Priority::High));
        assert_eq!(criteria.status, StatusFilter::Pending);
        assert_eq!(criteria.due_date_sort, DueDateSort::Soonest);

        let bad = ListArgs {
            status: Some("someday".to_string()),
            ..ListArgs::default()
        };
        assert!(criteria_from_args(&bad, &ctx).is_err());
    }
}
