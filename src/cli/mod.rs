//! CLI command definitions for tasklist
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod commands;

use crate::types::SortOrder;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Sort order as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Important first, then by name
    Name,
    /// Important first, then oldest first
    Date,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortOrder::ByName,
            SortArg::Date => SortOrder::ByDate,
        }
    }
}

/// Output format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    #[default]
    Markdown,
    Json,
}

/// Task list with persisted sort and filter preferences
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to preference file (overrides config)
    #[arg(short, long, global = true)]
    pub preferences: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Markdown, global = true)]
    pub format: FormatArg,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the filtered, sorted task list (default if no subcommand given)
    List(ListArgs),

    /// Add a task
    Add(AddArgs),

    /// Rename a task or change its importance
    Edit(EditArgs),

    /// Mark a task completed
    Check(TaskIdArgs),

    /// Mark a task not completed
    Uncheck(TaskIdArgs),

    /// Delete a task
    Delete(TaskIdArgs),

    /// Delete every completed task
    ClearCompleted(ClearCompletedArgs),

    /// Show or change the sort/filter preferences
    Prefs(PrefsArgs),

    /// Print the list again every time it changes, until Ctrl-C
    Watch(WatchArgs),
}

/// Arguments for the list subcommand
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only tasks whose name contains this text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Change the persisted sort order before listing
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Change the persisted hide-completed flag before listing
    #[arg(long)]
    pub hide_completed: Option<bool>,
}

/// Arguments for the add subcommand
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task name
    pub name: String,

    /// Mark the task important
    #[arg(short, long)]
    pub important: bool,
}

/// Arguments for the edit subcommand
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Task id
    pub id: i64,

    /// New name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New importance
    #[arg(short, long)]
    pub important: Option<bool>,
}

/// A single task id
#[derive(Args, Debug)]
pub struct TaskIdArgs {
    /// Task id
    pub id: i64,
}

/// Arguments for the clear-completed subcommand
#[derive(Args, Debug)]
pub struct ClearCompletedArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the prefs subcommand
#[derive(Args, Debug)]
pub struct PrefsArgs {
    /// New sort order
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// New hide-completed flag
    #[arg(long)]
    pub hide_completed: Option<bool>,
}

/// Arguments for the watch subcommand
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Only tasks whose name contains this text
    #[arg(short, long)]
    pub search: Option<String>,
}
