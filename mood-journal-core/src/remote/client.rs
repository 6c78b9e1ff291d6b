//! HTTP client for the remote diary service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use uuid::Uuid;

use super::error::RemoteError;
use super::wire::{
    ApiResponse, CreateEntryRequest, EntryFields, RegisterDeviceRequest, RemoteEntry,
    UpdateEntryRequest,
};
use crate::models::DiaryEntry;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request/response surface of the remote diary service.
///
/// All operations are scoped to a device id.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Idempotent device registration.
    async fn register_device(&self, device_id: &str) -> Result<(), RemoteError>;

    /// Inserts a new remote entry under `entry.id`.
    ///
    /// Fails with `Conflict` when the device already holds that id or day.
    async fn create_entry(&self, entry: &DiaryEntry, device_id: &str) -> Result<(), RemoteError>;

    /// Unconditionally replaces the fields of remote entry `id`.
    ///
    /// Fails with `NotFound` when no such entry exists for the device.
    async fn overwrite_entry(
        &self,
        id: Uuid,
        fields: &EntryFields,
        device_id: &str,
    ) -> Result<(), RemoteError>;

    /// Full snapshot of the device's remote entries.
    async fn list_entries(&self, device_id: &str) -> Result<Vec<DiaryEntry>, RemoteError>;
}

/// [`RemoteClient`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    server_url: String,
    http: reqwest::Client,
}

impl HttpRemoteClient {
    /// Creates a client with the default request timeout.
    pub fn new(server_url: &str) -> Result<Self, RemoteError> {
        Self::with_timeout(server_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client whose requests time out after `timeout`.
    pub fn with_timeout(server_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let server_url = normalize_base_url(server_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::InvalidRequest(e.to_string()))?;

        Ok(Self { server_url, http })
    }

    /// Returns the normalized server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Builds an HTTP URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status, body));
        }

        Ok(response)
    }

    /// Reads a write acknowledgment.
    async fn acknowledge(response: Response) -> Result<(), RemoteError> {
        let body = response.text().await?;
        let ack: ApiResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;

        if ack.success {
            Ok(())
        } else {
            Err(RemoteError::ServerError(ack.message))
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn register_device(&self, device_id: &str) -> Result<(), RemoteError> {
        let request = self.http.post(self.url("/users")).json(&RegisterDeviceRequest {
            device_id: device_id.to_string(),
        });

        // Any well-formed HTTP answer counts as registered; only transport
        // failures are reported.
        match Self::send(request).await {
            Ok(_) => Ok(()),
            Err(e @ (RemoteError::Transport(_) | RemoteError::InvalidRequest(_))) => Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "Device registration answered with an error");
                Ok(())
            }
        }
    }

    async fn create_entry(&self, entry: &DiaryEntry, device_id: &str) -> Result<(), RemoteError> {
        let request = self
            .http
            .post(self.url("/diary-entries"))
            .json(&CreateEntryRequest::new(entry, device_id));

        let response = Self::send(request).await?;
        Self::acknowledge(response).await
    }

    async fn overwrite_entry(
        &self,
        id: Uuid,
        fields: &EntryFields,
        device_id: &str,
    ) -> Result<(), RemoteError> {
        let request = self
            .http
            .put(self.url(&format!("/diary-entries/{}", id)))
            .query(&[("device_id", device_id)])
            .json(&UpdateEntryRequest::from(fields));

        let response = Self::send(request).await?;
        Self::acknowledge(response).await
    }

    async fn list_entries(&self, device_id: &str) -> Result<Vec<DiaryEntry>, RemoteError> {
        let request = self
            .http
            .get(self.url("/diary-entries"))
            .query(&[("device_id", device_id)]);

        let response = Self::send(request).await?;
        let body = response.text().await?;
        let items: Vec<RemoteEntry> =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let uuid = item.entry_uuid.clone();
            match item.into_entry() {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(entry_uuid = %uuid, error = %e, "Skipping remote entry"),
            }
        }

        Ok(entries)
    }
}

/// Normalizes the server URL: adds `http://` to bare hosts, maps `ws(s)://`
/// to `http(s)://` and strips trailing slashes.
fn normalize_base_url(server_url: &str) -> Result<String, RemoteError> {
    let server_url = server_url.trim();
    if server_url.is_empty() {
        return Err(RemoteError::InvalidRequest(
            "Server URL is empty".to_string(),
        ));
    }

    let base_url = if let Some(rest) = server_url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
        format!("http://{}", server_url)
    } else {
        server_url.to_string()
    };

    Ok(base_url.trim_end_matches('/').to_string())
}
