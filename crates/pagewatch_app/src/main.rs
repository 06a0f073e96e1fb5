//! pagewatch: polls web pages and reports changes to subscribers.

mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use pagewatch_engine::SnapshotFile;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "pagewatch", version, about = "Watches web pages for changes")]
struct Cli {
    #[arg(short, long, default_value = "pagewatch.toml")]
    config: PathBuf,

    /// Log at debug level regardless of the config file.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll until interrupted with Ctrl-C
    Run,
    /// Run a single poll tick and exit
    Once,
    /// Start tracking a URL for a subscriber
    Add { subscriber: String, url: String },
    /// Stop tracking a URL, or drop the subscriber entirely when no URL is given
    Remove {
        subscriber: String,
        url: Option<String>,
    },
    /// Suspend notifications for a subscriber
    Pause { subscriber: String },
    /// Resume notifications for a subscriber
    Resume { subscriber: String },
    /// Show subscriptions and what has been observed so far
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {:?}", cli.config))?;
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        config.level_filter()?
    };
    logging::initialize(config.log_destination(), level);

    let file = SnapshotFile::new(&config.snapshot_path);

    match cli.command {
        Command::Run => commands::run(&config, file).await?,
        Command::Once => commands::once(&config, file).await?,
        Command::Add { subscriber, url } => {
            commands::edit_subscriptions(&file, |book| book.subscribe(&subscriber, &url))?;
            println!("Added for monitoring: {url}");
        }
        Command::Remove {
            subscriber,
            url: Some(url),
        } => {
            commands::edit_subscriptions(&file, |book| book.unsubscribe(&subscriber, &url))?;
            println!("Stopped monitoring {url} for {subscriber}");
        }
        Command::Remove {
            subscriber,
            url: None,
        } => {
            commands::edit_subscriptions(&file, |book| book.remove_subscriber(&subscriber))?;
            println!("Removed subscriber {subscriber}");
        }
        Command::Pause { subscriber } => {
            let changed = commands::edit_subscriptions(&file, |book| book.pause(&subscriber))?;
            let note = if changed { "Paused" } else { "Already paused:" };
            println!("{note} {subscriber}");
        }
        Command::Resume { subscriber } => {
            let changed = commands::edit_subscriptions(&file, |book| book.resume(&subscriber))?;
            let note = if changed { "Resumed" } else { "Not paused:" };
            println!("{note} {subscriber}");
        }
        Command::List => {
            let (book, resources) = commands::load_state(&file)?.into_parts();
            print!("{}", commands::render_listing(&book, &resources));
        }
    }

    Ok(())
}
