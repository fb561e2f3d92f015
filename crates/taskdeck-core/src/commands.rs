mod modifiers;
mod session;
mod task_ops;
mod views;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::cli::{Command, ListArgs};
use crate::config::Config;
use crate::error::StoreOp;
use crate::notice::{NoticeSink, report};
use crate::render::Renderer;
use crate::service::{FileService, TaskService};
use crate::store::TaskStore;
use crate::task::Task;

pub use modifiers::{Mod, parse_title_and_mods};
pub use session::{cmd_login, cmd_logout, cmd_whoami};
pub use task_ops::{cmd_add, cmd_delete, cmd_edit, cmd_toggle};
pub use views::{cmd_calendar, cmd_categories, cmd_dashboard, cmd_list, cmd_show};

/// Per-invocation state shared by every command.
pub struct CommandContext<'a> {
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
    pub sink: &'a mut dyn NoticeSink,
    pub tz: Tz,
    pub now: DateTime<Utc>,
}

#[instrument(skip(store, ctx, command))]
pub fn dispatch(
    store: &mut TaskStore<FileService>,
    ctx: &mut CommandContext<'_>,
    command: Option<Command>,
) -> anyhow::Result<()> {
    let command = command.unwrap_or_else(|| {
        debug!("no explicit command, using list");
        Command::List(ListArgs::default())
    });
    debug!(?command, "dispatching command");

    match command {
        Command::Login { handle } => cmd_login(store.service(), &handle),
        Command::Logout => cmd_logout(store.service()),
        Command::Whoami => cmd_whoami(store.service()),
        Command::Add { words } => cmd_add(store, ctx, &words),
        Command::Edit { id, mods } => cmd_edit(store, ctx, &id, &mods),
        Command::Toggle { id } => cmd_toggle(store, ctx, &id),
        Command::Delete { id } => cmd_delete(store, ctx, &id),
        Command::Show { id } => cmd_show(store, ctx, &id),
        Command::List(args) => cmd_list(store, ctx, &args),
        Command::Categories => cmd_categories(store, ctx),
        Command::Dashboard => cmd_dashboard(store, ctx),
        Command::Calendar(args) => cmd_calendar(store, ctx, &args),
    }
}

/// Loads the signed-in user's tasks, reporting a failure through the sink.
fn load_tasks<S: TaskService>(
    store: &mut TaskStore<S>,
    sink: &mut dyn NoticeSink,
) -> anyhow::Result<()> {
    let outcome = store.load().map(|tasks| tasks.len());
    let count = report(sink, StoreOp::Load, outcome)?;
    debug!(count, "tasks loaded for command");
    Ok(())
}

/// Resolves a full id or an unambiguous prefix of one against `tasks`.
/// Hyphens are ignored, so both the short and hyphenated forms work.
pub fn resolve_id(tasks: &[Task], token: &str) -> anyhow::Result<Uuid> {
    let needle = token.trim().to_ascii_lowercase().replace('-', "");
    if needle.is_empty() {
        return Err(anyhow!("task id cannot be empty"));
    }

    let matches: Vec<Uuid> = tasks
        .iter()
        .filter(|task| task.id.simple().to_string().starts_with(&needle))
        .map(|task| task.id)
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!("no task matches id {token}")),
        many => Err(anyhow!(
            "id {token} is ambiguous: {} tasks match",
            many.len()
        )),
    }
}
