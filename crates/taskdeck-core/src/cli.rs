use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        let key = k.trim();
        if key.is_empty() {
            return Err(anyhow!("expected KEY=VALUE, got: {s}"));
        }
        Ok(Self {
            key: key.to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "Taskdeck: personal task manager with dashboard and calendar views",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Override a config key for this run, e.g. `--rc week.start=monday`.
    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a session as HANDLE.
    Login { handle: String },
    /// End the current session.
    Logout,
    /// Print the signed-in user.
    Whoami,
    /// Create a task: words form the title; priority:, due:, category: and
    /// desc: tokens set fields.
    Add {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Change fields of a task. Bare words replace the title.
    Edit {
        id: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        mods: Vec<String>,
    },
    /// Flip a task between open and completed.
    Toggle { id: String },
    Delete { id: String },
    Show { id: String },
    List(ListArgs),
    Categories,
    Dashboard,
    Calendar(CalendarArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    #[arg(long, short = 's')]
    pub search: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// none, soonest or latest. Defaults to `list.sort`.
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarArgs {
    /// Month to show as YYYY-MM. Defaults to the current month.
    #[arg(long)]
    pub month: Option<String>,

    #[arg(long, action = ArgAction::Count)]
    pub prev: u8,

    #[arg(long, action = ArgAction::Count)]
    pub next: u8,
}

impl CalendarArgs {
    pub fn month_offset(&self) -> i32 {
        i32::from(self.next) - i32::from(self.prev)
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
