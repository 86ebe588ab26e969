//! Media offload to an S3-compatible object store.
//!
//! Reacts to the upload lifecycle of the hosting runtime:
//!
//! - post-upload: [`MediaOffloader::handle_upload`]
//! - metadata generated: [`MediaOffloader::offload_metadata`]
//! - metadata updated: [`MediaOffloader::update_metadata`]
//! - image editor save: [`MediaOffloader::offload_edited_image`]
//! - attachment deleted: [`MediaOffloader::delete`]

pub mod error;
pub mod fingerprint;
pub mod service;
pub mod types;
pub mod uploads;

#[cfg(test)]
mod tests;

pub use error::OffloadError;
pub use fingerprint::{is_edited, purge_prefix, strip_fingerprints};
pub use service::{MediaOffloader, OffloadSettings, human_readable_size};
pub use types::{
    AttachmentMetadata, MetadataContext, PurgeReport, SizeVariant, UploadResult, UploadedFile,
};
pub use uploads::{UploadDir, tenant_basedir};
