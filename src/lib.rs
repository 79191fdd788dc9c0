pub mod api;
pub mod config;
pub mod error;
pub mod jsonld;
pub mod logic;
pub mod model;
pub mod store;

pub use api::routes::create_router;
pub use api::AppState;
pub use config::{AppConfig, StorageBackend};
pub use error::{ApiError, ErrorKey, ErrorResponse};
pub use store::{MemoryStore, PostgresStore, Store};

use std::sync::Arc;
use tokio::net::TcpListener;

/// Build the application for a store and configuration
pub fn app<S: Store + 'static>(store: Arc<S>, config: AppConfig) -> axum::Router {
    create_router().with_state(AppState::new(store, config))
}

/// Serve the API on an already bound listener
pub async fn serve<S: Store + 'static>(
    listener: TcpListener,
    store: Arc<S>,
    config: AppConfig,
) -> anyhow::Result<()> {
    axum::serve(listener, app(store, config)).await?;
    Ok(())
}

/// Open the configured storage backend and serve until shutdown
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Template server listening on http://{}", bind_address);

    match config.storage.backend {
        StorageBackend::Memory => {
            log::warn!("Using the in-memory store; documents are lost on shutdown");
            serve(listener, Arc::new(MemoryStore::new()), config).await
        }
        StorageBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let max_connections = config.database.max_connections.unwrap_or(20);
            let postgres_store = PostgresStore::new(&database_url, max_connections).await?;
            postgres_store.migrate().await?;
            log::info!("Database ready");
            serve(listener, Arc::new(postgres_store), config).await
        }
    }
}
