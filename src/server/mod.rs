//! Development diary service.
//!
//! # Endpoints
//!
//! - `GET /`: service banner
//! - `POST /users`: register a device (idempotent)
//! - `POST /diary-entries`: create an entry
//! - `GET /diary-entries?device_id=`: list a device's entries, newest first
//! - `PUT /diary-entries/{entry_uuid}?device_id=`: partial update
//!
//! Errors are returned as `{"detail": "..."}`.

pub mod error;
mod routes;
pub mod storage;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::{ServerError, ServerResult};
pub use storage::{ServerStorageError, ServerStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ServerStore>,
}

/// Builds the service router over `store`.
pub fn router(store: Arc<ServerStore>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/users", post(routes::register_device))
        .route(
            "/diary-entries",
            post(routes::create_entry).get(routes::list_entries),
        )
        .route("/diary-entries/{entry_uuid}", put(routes::update_entry))
        .with_state(AppState { store })
        .layer(TraceLayer::new_for_http())
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Directory holding the snapshot
    pub data_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables:
    /// - `MOOD_SERVER_PORT` (default: 8000)
    /// - `MOOD_SERVER_DATA_DIR` (default: ~/.local/share/mood-server)
    pub fn from_env() -> Self {
        let port = std::env::var("MOOD_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let data_dir = std::env::var("MOOD_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("mood-server")
            });

        Self { port, data_dir }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn entry_body(uuid: &str, date: &str) -> Value {
        json!({
            "entry_uuid": uuid,
            "entry_date": date,
            "mood_score": 14,
            "mood_percentage": 70,
            "activities": ["walk"],
            "notes": "fine",
            "device_id": "dev"
        })
    }

    fn app() -> Router {
        router(Arc::new(ServerStore::in_memory()))
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = call(&app(), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    async fn test_register_twice() {
        let app = app();
        let request = json!({ "device_id": "dev" });

        let (status, body) = call(&app, Method::POST, "/users", Some(request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Device registered successfully");

        let (_, body) = call(&app, Method::POST, "/users", Some(request)).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Device already exists");
    }

    #[tokio::test]
    async fn test_create_unregistered_device() {
        let (status, body) = call(
            &app(),
            Method::POST,
            "/diary-entries",
            Some(entry_body("a", "2024-01-10 00:00:00")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Device not registered");
    }

    #[tokio::test]
    async fn test_create_list_and_conflict() {
        let app = app();
        call(&app, Method::POST, "/users", Some(json!({ "device_id": "dev" }))).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/diary-entries",
            Some(entry_body("a", "2024-01-10 00:00:00")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["entry_uuid"], "a");

        let (status, body) = call(
            &app,
            Method::POST,
            "/diary-entries",
            Some(entry_body("b", "2024-01-10 00:00:00")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "Diary entry already exists");

        let (status, body) = call(&app, Method::GET, "/diary-entries?device_id=dev", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["entry_date"], "2024-01-10T00:00:00.000000");
        assert_eq!(items[0]["activities"][0], "walk");
    }

    #[tokio::test]
    async fn test_invalid_date_is_rejected() {
        let app = app();
        call(&app, Method::POST, "/users", Some(json!({ "device_id": "dev" }))).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/diary-entries",
            Some(entry_body("a", "someday")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("someday"));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let app = app();
        call(&app, Method::POST, "/users", Some(json!({ "device_id": "dev" }))).await;
        call(
            &app,
            Method::POST,
            "/diary-entries",
            Some(entry_body("a", "2024-01-10 00:00:00")),
        )
        .await;

        let (status, body) = call(
            &app,
            Method::PUT,
            "/diary-entries/a?device_id=dev",
            Some(json!({ "notes": "changed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Diary entry updated successfully");

        let (_, body) = call(&app, Method::GET, "/diary-entries?device_id=dev", None).await;
        assert_eq!(body[0]["notes"], "changed");
        assert_eq!(body[0]["mood_percentage"], 70);

        let (status, body) = call(
            &app,
            Method::PUT,
            "/diary-entries/missing?device_id=dev",
            Some(json!({ "notes": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Diary entry not found");
    }
}
