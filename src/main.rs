use std::sync::Arc;

use projectboard::config::Config;
use projectboard::routes;
use projectboard::services::persistence;
use projectboard::state::AppState;
use projectboard::store::{MemoryStorage, PgStorage, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = if let Some(url) = &config.database_url {
        let storage = PgStorage::connect(url, config.db_max_connections).await?;
        tracing::info!(max_connections = config.db_max_connections, "postgres storage ready");
        Arc::new(storage)
    } else if config.dev_open_access {
        tracing::warn!("DATABASE_URL not set; in-memory storage with open access, data is not durable");
        Arc::new(MemoryStorage::with_open_access())
    } else {
        tracing::warn!("DATABASE_URL not set; in-memory storage, no tokens will authenticate");
        Arc::new(MemoryStorage::new())
    };

    let port = config.port;
    let state = AppState::new(storage, config);

    // Spawn background persistence task.
    let _persistence = persistence::spawn_persistence_task(state.clone());

    let app = routes::app(state.clone());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!(%port, "projectboard listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let written = persistence::flush_all_dirty(&state).await;
    tracing::info!(written, "final column flush complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
