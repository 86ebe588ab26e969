//! URL rewriting.
//!
//! A [`RewriteConfig`] is built once from the application settings. Each
//! request gets its own [`RewriteEngine`], which memoizes results in a
//! [`RewriteCache`] that dies with the request.

pub mod bypass;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
mod parts;
pub mod value;

#[cfg(test)]
mod props;

pub use bypass::{BypassKind, BypassMatcher, BypassRule};
pub use cache::RewriteCache;
pub use config::{MediaTarget, RewriteConfig};
pub use engine::RewriteEngine;
pub use error::RewriteError;
pub use value::{UrlHook, UrlValue};
