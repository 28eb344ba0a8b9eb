//! CLI entry point for todo-sync.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use time::UtcOffset;
use todo_sync_core::FilterMode;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// To-do list synchronized through a realtime database.
#[derive(Parser, Debug)]
#[command(
    name = "todo-sync",
    version,
    about = "todo-sync: a to-do list kept in a Firebase Realtime Database"
)]
struct Cli {
    /// Configuration file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the local JSON file instead of Firebase.
    #[arg(long, global = true)]
    offline: bool,

    /// Do not print log lines.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account and remember the session.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },

    /// Forget the stored session.
    Logout,

    /// Create a task.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// List tasks.
    Ls {
        #[arg(long, default_value_t = FilterMode::All)]
        filter: FilterMode,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Change a task's title and/or description.
    Edit {
        #[arg(long, allow_hyphen_values = true)]
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Flip a task's completion flag.
    Toggle {
        #[arg(long, allow_hyphen_values = true)]
        id: String,
    },

    /// Delete a task.
    Rm {
        #[arg(long, allow_hyphen_values = true)]
        id: String,
    },

    /// Print the task list on every change until interrupted.
    Watch {
        #[arg(long, default_value_t = FilterMode::All)]
        filter: FilterMode,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum LsFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let Cli {
        config,
        offline,
        quiet,
        cmd,
    } = Cli::parse();

    if should_install_tracing(quiet) {
        install_tracing();
    }

    // Must be read before the runtime starts its worker threads.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let options = commands::Options {
        config,
        offline,
        offset,
    };
    tokio::runtime::Runtime::new()?.block_on(commands::run(cmd, &options))
}

const fn should_install_tracing(quiet: bool) -> bool {
    !quiet
}

fn install_tracing() {
    // RUST_LOG is honored; INFO by default.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
