//! Sync CLI commands for synchronizing with the server.

use clap::{Args, Subcommand};
use mood_journal_core::{RemoteError, SyncEngine, SyncReport};

use moodjournal::config::Config;

use crate::sync::check_server;

/// Sync with remote server
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,
}

impl SyncCommand {
    pub async fn run(&self, engine: &SyncEngine, config: &Config) -> Result<(), SyncCommandError> {
        match &self.command {
            None => self.sync(engine, config).await,
            Some(SyncSubcommand::Status) => self.status(engine, config).await,
        }
    }

    async fn sync(&self, engine: &SyncEngine, config: &Config) -> Result<(), SyncCommandError> {
        if !config.sync.is_configured() {
            return Err(SyncCommandError::NotConfigured);
        }

        println!("Syncing with server...");
        println!();

        let report = engine.startup().await?;
        print_report(&report);

        println!();
        if report.is_clean() {
            println!("Sync complete.");
        } else {
            println!("Sync finished with errors; failed entries stay pending.");
        }

        Ok(())
    }

    async fn status(&self, engine: &SyncEngine, config: &Config) -> Result<(), SyncCommandError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        println!("Device:    {}", engine.device_id());
        println!("Pending:   {}", engine.pending_count());
        println!();

        let Some(server_url) = config
            .sync
            .server_url
            .as_deref()
            .filter(|_| config.sync.is_configured())
        else {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8000\"");
            println!("    auto_sync: false");
            println!();
            println!("Or set the environment variable:");
            println!("  MOOD_SYNC_URL");
            return Ok(());
        };

        println!("Server:    {}", server_url);
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();

        print!("Server status: ");
        if check_server(server_url).await {
            println!("✓ connected");
        } else {
            println!("✗ unreachable");
        }

        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let uploaded = report.upload.uploaded;
    let pushed = report.merge.pushed;
    let adopted = report.merge.adopted;

    println!("  ✓ uploaded {} pending entr{}", uploaded, plural(uploaded));
    println!("  ✓ pushed {} local entr{}", pushed, plural(pushed));
    println!("  ✓ downloaded {} new entr{}", adopted, plural(adopted));

    for failure in report.failures() {
        println!("  ✗ {}: {}", failure.id, failure.error);
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    NotConfigured,
    SyncError(RemoteError),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::NotConfigured => write!(
                f,
                "Sync is not configured. Set sync.server_url or MOOD_SYNC_URL."
            ),
            SyncCommandError::SyncError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::SyncError(e) => Some(e),
            SyncCommandError::NotConfigured => None,
        }
    }
}

impl From<RemoteError> for SyncCommandError {
    fn from(e: RemoteError) -> Self {
        SyncCommandError::SyncError(e)
    }
}
