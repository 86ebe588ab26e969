//! Core logic for Wharf.
//!
//! This crate contains the URL rewrite engine, tenant resolution and media
//! offload with ZERO web or database dependencies. Persistence and HTTP
//! plumbing live in `wharf-db` and `wharf-api`.
//!
//! # Modules
//!
//! - `domain` - Base domain and subdomain extraction
//! - `rewrite` - Request-scoped URL rewriting with bypass rules
//! - `tenant` - Tenant context and host-based resolution
//! - `storage` - S3-compatible object store behind OpenDAL
//! - `offload` - Media upload, edit and purge against the object store

pub mod domain;
pub mod offload;
pub mod rewrite;
pub mod storage;
pub mod tenant;
