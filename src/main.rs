//! tasklist
//!
//! Command-line front end for the task list: add, edit, complete, delete,
//! search, sort and filter tasks stored in a local SQLite database.

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::io::{BufRead, Write};
use tasklist::cli::commands::App;
use tasklist::cli::{Cli, Command, FormatArg, ListArgs};
use tasklist::config::Config;
use tasklist::error::StoreError;
use tasklist::format::OutputFormat;
use tasklist::logging::{LogTarget, init_logging};
use tracing::debug;

fn output_format(arg: FormatArg) -> OutputFormat {
    match arg {
        FormatArg::Markdown => OutputFormat::Markdown,
        FormatArg::Json => OutputFormat::Json,
    }
}

/// Ask on the terminal before deleting completed tasks.
fn confirm_clear() -> bool {
    eprint!("Do you really want to delete all completed tasks? [y/N] ");
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn run(cli: Cli, config: Config, format: OutputFormat) -> Result<()> {
    let app = App::open(&config, format).await?;

    let output = match cli.command.unwrap_or(Command::List(ListArgs::default())) {
        Command::List(args) => app.list(args).await?,
        Command::Add(args) => app.add(args).await?,
        Command::Edit(args) => app.edit(args).await?,
        Command::Check(args) => app.set_completed(args, true).await?,
        Command::Uncheck(args) => app.set_completed(args, false).await?,
        Command::Delete(args) => app.delete(args).await?,
        Command::ClearCompleted(args) => {
            let yes = args.yes;
            app.clear_completed(move || yes || confirm_clear()).await?
        }
        Command::Prefs(args) => app.prefs(args).await?,
        Command::Watch(args) => {
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            app.watch(args, shutdown, |text| println!("{}", text))
                .await?;
            return Ok(());
        }
    };

    if !output.is_empty() {
        println!("{}", output.trim_end());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::discover(cli.config.as_deref())?;

    // Override paths from CLI arguments
    if let Some(db_path) = &cli.database {
        config.paths.database = db_path.clone();
    }
    if let Some(prefs_path) = &cli.preferences {
        config.paths.preferences = prefs_path.clone();
    }

    init_logging(&LogTarget::parse(&cli.log), cli.verbose, &config.logging.level)?;
    debug!(?config, "configuration loaded");

    let format = output_format(cli.format);
    if let Err(err) = run(cli, config, format).await {
        if format == OutputFormat::Json {
            let code = err.downcast_ref::<StoreError>().map(StoreError::code);
            println!(
                "{}",
                json!({ "error": { "code": code, "message": format!("{:#}", err) } })
            );
            std::process::exit(1);
        }
        return Err(err);
    }

    Ok(())
}
