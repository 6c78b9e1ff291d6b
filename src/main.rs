use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod sync;

use commands::{AddArgs, ConfigCommand, DateArgs, DeviceCommand, EditArgs, ListArgs, SyncCommand};
use moodjournal::config::Config;
use sync::{open_engine, try_auto_sync};

#[derive(Parser)]
#[command(name = "mood")]
#[command(version)]
#[command(about = "A mood journal that syncs with your diary server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the mood for a day
    Add(AddArgs),

    /// Change the entry of a day
    Edit(EditArgs),

    /// Delete the entry of a day (local only)
    Delete(DateArgs),

    /// Show the entry of a day
    Show(DateArgs),

    /// List all entries
    List(ListArgs),

    /// Sync with remote server
    Sync(SyncCommand),

    /// Show this device's id
    Device(DeviceCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Add(args)) => {
            let engine = open_engine(&config)?;
            args.run(&engine).await?;
        }
        Some(Commands::Edit(args)) => {
            let engine = open_engine(&config)?;
            args.run(&engine).await?;
        }
        Some(Commands::Delete(args)) => {
            let engine = open_engine(&config)?;
            args.delete(&engine)?;
        }
        Some(Commands::Show(args)) => {
            let engine = open_engine(&config)?;
            try_auto_sync(&engine, &config).await;
            args.show(&engine)?;
        }
        Some(Commands::List(args)) => {
            let engine = open_engine(&config)?;
            try_auto_sync(&engine, &config).await;
            args.run(&engine)?;
        }
        Some(Commands::Sync(cmd)) => {
            let engine = open_engine(&config)?;
            cmd.run(&engine, &config).await?;
        }
        Some(Commands::Device(cmd)) => {
            cmd.run(&config);
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
