//! Object storage for offloaded media using Apache OpenDAL.
//!
//! Targets S3-compatible stores (AWS S3, Backblaze B2, MinIO, R2) with
//! versioning enabled and path-style addressing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ObjectStore (trait)                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ put_file(key, local_path)  │ list_object_versions(prefix)       │
//! │                            │ delete_object_versions(versions)   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │              S3ObjectStore (OpenDAL S3 operator)                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CompatFetcher: public-read ACL, Content-MD5 shim, re-signing    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod compat;
mod config;
mod error;
mod service;

pub use compat::{CompatFetcher, apply_checksum_compat, apply_public_read, is_batch_delete};
pub use config::StorageConfig;
pub use error::StorageError;
pub use service::{ObjectStore, ObjectVersion, S3ObjectStore};
