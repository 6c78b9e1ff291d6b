//! Mood Journal development server
//!
//! Serves the diary HTTP API the `mood` CLI syncs against.
//!
//! # Configuration
//!
//! Environment variables:
//! - `MOOD_SERVER_PORT`: Port to listen on (default: 8000)
//! - `MOOD_SERVER_DATA_DIR`: Directory for the JSON snapshot (default: ~/.local/share/mood-server)

use std::sync::Arc;

use moodjournal::server::{router, ServerConfig, ServerStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodjournal=info,mood_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());

    let store = Arc::new(ServerStore::open(&config.data_dir)?);
    let app = router(store);

    let addr = config.addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
