pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod notice;
pub mod render;
pub mod service;
pub mod stats;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::{
  StoreError,
  StoreOp
};
pub use filter::FilterCriteria;
pub use service::{
  FileService,
  MemoryService,
  TaskService
};
pub use store::TaskStore;
pub use task::{
  NewTask,
  Priority,
  Principal,
  Task,
  TaskPatch
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskdeck CLI"
  );
  debug!(?cli.rc_overrides, "rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  debug!(config = ?cfg.loaded_file, "config resolved");
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let service =
    service::FileService::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open task service \
         at {}",
        data_dir.display()
      )
    })?;
  let mut store =
    store::TaskStore::new(service);

  let tz = datetime::resolve_timezone(
    cfg.timezone().as_deref()
  );
  let renderer =
    render::Renderer::new(&cfg, tz);

  let mut terminal =
    notice::TerminalSink::new(
      cfg.color()
    );
  let mut silent = notice::SilentSink;
  let sink: &mut dyn notice::NoticeSink =
    if cfg.notify() {
      &mut terminal
    } else {
      &mut silent
    };

  let mut ctx =
    commands::CommandContext {
      cfg: &cfg,
      renderer: &renderer,
      sink,
      tz,
      now: Utc::now()
    };

  commands::dispatch(
    &mut store,
    &mut ctx,
    cli.command
  )?;

  info!("done");
  Ok(())
}
