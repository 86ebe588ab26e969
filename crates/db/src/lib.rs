//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - the `blogs` entity backing the tenant directory
//! - [`TenantRepository`], the `TenantDirectory` used by tenant resolution
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::TenantRepository;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use wharf_shared::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    tracing::debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "connecting to database"
    );
    Database::connect(options).await
}
