//! Wiring of the sync engine for CLI commands.

mod auto_sync;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mood_journal_core::remote::EntryFields;
use mood_journal_core::{
    DeviceIdentity, DiaryEntry, EntryStorage, HttpRemoteClient, RemoteClient, RemoteError,
    SyncEngine,
};
use uuid::Uuid;

use moodjournal::config::Config;

pub use auto_sync::try_auto_sync;

const NOT_CONFIGURED: &str = "sync server not configured";

/// Remote used when no server URL is configured. Every call fails, so entries
/// stay pending until a server is set up.
pub struct UnconfiguredRemote;

#[async_trait]
impl RemoteClient for UnconfiguredRemote {
    async fn register_device(&self, _device_id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::InvalidRequest(NOT_CONFIGURED.to_string()))
    }

    async fn create_entry(&self, _entry: &DiaryEntry, _device_id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::InvalidRequest(NOT_CONFIGURED.to_string()))
    }

    async fn overwrite_entry(
        &self,
        _id: Uuid,
        _fields: &EntryFields,
        _device_id: &str,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::InvalidRequest(NOT_CONFIGURED.to_string()))
    }

    async fn list_entries(&self, _device_id: &str) -> Result<Vec<DiaryEntry>, RemoteError> {
        Err(RemoteError::InvalidRequest(NOT_CONFIGURED.to_string()))
    }
}

/// Opens the engine over the configured data directory and server.
pub fn open_engine(config: &Config) -> Result<SyncEngine, RemoteError> {
    let data_dir = config.data_dir.value.clone();
    let device_id = DeviceIdentity::new(data_dir.clone()).current_device_id();

    let remote: Arc<dyn RemoteClient> = match config.sync.server_url.as_deref() {
        Some(url) if config.sync.is_configured() => Arc::new(HttpRemoteClient::with_timeout(
            url,
            config.sync.request_timeout(),
        )?),
        _ => Arc::new(UnconfiguredRemote),
    };

    Ok(SyncEngine::with_pacing(
        remote,
        EntryStorage::new(data_dir),
        device_id,
        config.sync.upload_pacing(),
    ))
}

/// Checks whether the diary service answers at `server_url`.
pub async fn check_server(server_url: &str) -> bool {
    let Ok(client) = HttpRemoteClient::new(server_url) else {
        return false;
    };
    let Ok(http) = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    else {
        return false;
    };

    match http.get(format!("{}/", client.server_url())).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path, server_url: Option<&str>) -> Config {
        let config_path = dir.join("config.yaml");
        let mut yaml = format!("data_dir: {}\n", dir.join("data").display());
        if let Some(url) = server_url {
            yaml.push_str(&format!("sync:\n  server_url: \"{}\"\n", url));
        }
        std::fs::write(&config_path, yaml).unwrap();
        Config::load(Some(config_path)).unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_engine_keeps_entries_pending() {
        let dir = tempdir().unwrap();
        let engine = open_engine(&config_in(dir.path(), None)).unwrap();

        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        engine.add_entry(DiaryEntry::new(day, 10, 50)).await.unwrap();

        assert_eq!(engine.pending_count(), 1);
        assert!(engine
            .status()
            .last_error
            .unwrap()
            .contains(NOT_CONFIGURED));
        assert!(dir.path().join("data").join("entries.json").exists());
    }

    #[tokio::test]
    async fn test_device_id_is_stable_across_opens() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), None);

        let first = open_engine(&config).unwrap().device_id().to_string();
        let second = open_engine(&config).unwrap().device_id().to_string();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_check_server_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!check_server(&format!("127.0.0.1:{}", port)).await);
    }
}
