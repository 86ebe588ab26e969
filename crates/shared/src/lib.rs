//! Shared errors and configuration for Wharf.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{
    AppConfig, DatabaseConfig, Environment, RewriteSettings, ServerConfig, SiteConfig,
    StorageSettings,
};
pub use error::AppError;
