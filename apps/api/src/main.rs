use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gameboard_api::agents::{Orchestrator, ProviderGateway};
use gameboard_api::api;
use gameboard_api::config::AppConfig;
use gameboard_api::domain::repositories::{ArtifactStore, EntityStore};
use gameboard_api::infrastructure::artifacts::FsArtifactStore;
use gameboard_api::infrastructure::providers::HttpProviderGateway;
use gameboard_api::infrastructure::repositories::{MemoryEntityStore, PostgresEntityStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gameboard_api=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Pick the entity store
    let store: Arc<dyn EntityStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let store = PostgresEntityStore::new(pool);
            store.migrate().await?;
            tracing::info!("Database connected successfully");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(MemoryEntityStore::new())
        }
    };

    let artifacts: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(config.output_dir.clone()));

    let gateway_config = config.gateway_config();
    let configured = gateway_config.configured();
    if configured.is_empty() {
        tracing::warn!("No provider API keys configured, work pipelines will fail");
    } else {
        tracing::info!(providers = ?configured, "Providers configured");
    }
    let gateway: Arc<dyn ProviderGateway> = Arc::new(HttpProviderGateway::new(gateway_config)?);

    let orchestrator = Orchestrator::new(
        store,
        artifacts,
        gateway,
        config.orchestrator_settings(),
    );

    // Build router
    let app = api::router(orchestrator.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, draining job queue");
    orchestrator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
