//! Auto-sync before read commands.

use mood_journal_core::SyncEngine;

use moodjournal::config::Config;

use super::check_server;

/// Runs a full sync if `auto_sync` is enabled and the server is reachable.
///
/// Failures are printed and otherwise ignored so the CLI keeps working
/// offline.
pub async fn try_auto_sync(engine: &SyncEngine, config: &Config) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }

    let Some(url) = config.sync.server_url.as_deref() else {
        return;
    };

    if !check_server(url).await {
        eprintln!("Auto-sync: server unreachable, skipping");
        return;
    }

    match engine.startup().await {
        Ok(report) => {
            for failure in report.failures() {
                eprintln!("Auto-sync: entry {} not uploaded: {}", failure.id, failure.error);
            }
        }
        Err(e) => eprintln!("Auto-sync: {}", e),
    }
}
