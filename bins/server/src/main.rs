//! Wharf API Server
//!
//! Main entry point for the Wharf rewrite and media offload service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wharf_api::{AppState, create_router};
use wharf_core::offload::{MediaOffloader, OffloadSettings};
use wharf_core::rewrite::RewriteConfig;
use wharf_core::storage::{S3ObjectStore, StorageConfig};
use wharf_core::tenant::{TenantResolver, TenantSettings};
use wharf_db::{TenantRepository, connect_with};
use wharf_shared::{AppConfig, StorageSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wharf=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    info!(
        environment = config.site.environment.as_str(),
        home_url = %config.site.home_url_with_port(),
        "Configuration loaded"
    );

    // Connect to database
    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let rewrite = RewriteConfig::from_settings(&config.site, &config.storage, &config.rewrite)?;
    let resolver = TenantResolver::new(
        Arc::new(TenantRepository::new(db)),
        TenantSettings::from_site(&config.site)?,
    );
    let offloader = MediaOffloader::new(
        object_store(&config.storage)?,
        OffloadSettings::from_settings(&config.site, &config.storage),
    );

    // Create application state
    let state = AppState::new(rewrite, resolver, offloader);

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the object store, or `None` when credentials are not configured.
fn object_store(settings: &StorageSettings) -> anyhow::Result<Option<Arc<S3ObjectStore>>> {
    let storage_config = match StorageConfig::from_settings(settings) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Object storage not configured, media stays local");
            return Ok(None);
        }
    };

    info!(
        endpoint = %storage_config.endpoint,
        bucket = %storage_config.bucket,
        checksums = storage_config.checksums,
        "Object storage configured"
    );
    Ok(Some(Arc::new(S3ObjectStore::from_config(storage_config)?)))
}
