use anyhow::anyhow;
use tracing::{debug, info, instrument};

use super::modifiers::{new_task_from, parse_title_and_mods, patch_from};
use super::{CommandContext, load_tasks, resolve_id};
use crate::error::StoreOp;
use crate::notice::report;
use crate::service::TaskService;
use crate::store::TaskStore;

#[instrument(skip(store, ctx, args))]
pub fn cmd_add<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command add");

    let (title, mods) = parse_title_and_mods(args, ctx.now, &ctx.tz)?;
    let new_task = new_task_from(title, mods);
    let outcome = store.create(new_task);
    let task = report(ctx.sink, StoreOp::Create, outcome)?;

    debug!(id = %task.id, "task added");
    println!("Created task {}.", task.short_id());
    Ok(())
}

#[instrument(skip(store, ctx, args))]
pub fn cmd_edit<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
    id: &str,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command edit");

    let (title, mods) = parse_title_and_mods(args, ctx.now, &ctx.tz)?;
    let title = (!title.is_empty()).then_some(title);
    let patch = patch_from(title, mods);
    if patch.is_empty() {
        return Err(anyhow!(
            "edit: nothing to change (give new title words or priority:/due:/category:/desc: modifiers)"
        ));
    }

    load_tasks(store, ctx.sink)?;
    let id = resolve_id(store.tasks(), id)?;
    let outcome = store.update(id, patch);
    let task = report(ctx.sink, StoreOp::Update, outcome)?;

    println!("Updated task {}.", task.short_id());
    Ok(())
}

#[instrument(skip(store, ctx))]
pub fn cmd_toggle<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
    id: &str,
) -> anyhow::Result<()> {
    info!("command toggle");

    load_tasks(store, ctx.sink)?;
    let id = resolve_id(store.tasks(), id)?;
    let outcome = store.toggle_complete(id);
    match report(ctx.sink, StoreOp::Update, outcome)? {
        Some(task) if task.completed => println!("Completed task {}.", task.short_id()),
        Some(task) => println!("Reopened task {}.", task.short_id()),
        None => debug!(%id, "task disappeared before toggle"),
    }
    Ok(())
}

#[instrument(skip(store, ctx))]
pub fn cmd_delete<S: TaskService>(
    store: &mut TaskStore<S>,
    ctx: &mut CommandContext<'_>,
    id: &str,
) -> anyhow::Result<()> {
    info!("command delete");

    load_tasks(store, ctx.sink)?;
    let id = resolve_id(store.tasks(), id)?;
    let title = store
        .get(id)
        .map(|task| task.title.clone())
        .unwrap_or_default();
    let outcome = store.delete(id);
    report(ctx.sink, StoreOp::Delete, outcome)?;

    println!("Deleted task '{title}'.");
    Ok(())
}
