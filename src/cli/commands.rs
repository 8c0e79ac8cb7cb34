use clap::{Args, Parser, Subcommand};

use crate::model::task::{FilterMode, TaskId};

#[derive(Parser)]
#[command(name = "tl", about = concat!("tasklist v", env!("CARGO_PKG_VERSION"), " - a to-do list shared by every open terminal"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory (overrides storage.dir)
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Read configuration from this file
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task to the end of the list
    Add(AddArgs),
    /// Mark a task done, or not done again
    Toggle(IdArgs),
    /// Delete a task
    #[command(alias = "rm")]
    Delete(IdArgs),
    /// Delete every completed task
    Clear,
    /// Show tasks
    List(ListArgs),
    /// Show tasks and keep the view in sync with other processes
    Watch(ListArgs),
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
    /// Show or edit configuration
    Config(ConfigCmd),
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text (words are joined with spaces)
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct IdArgs {
    /// Task ID
    pub id: TaskId,
}

#[derive(Args)]
pub struct ListArgs {
    /// Which tasks to show
    #[arg(long, short, value_enum, default_value_t = FilterMode::All)]
    pub filter: FilterMode,
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Show only the N most recent entries
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than N days (default: 30)
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    pub days: Option<i64>,
    /// Remove every entry
    #[arg(long, conflicts_with = "days")]
    pub all: bool,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
    /// Set a value (storage.dir, storage.key, log.level)
    Set(ConfigSetArgs),
}

#[derive(Args)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}
