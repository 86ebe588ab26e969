//! Offload types and data structures.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One generated size of an image attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeVariant {
    /// File name, relative to the directory of the main file.
    pub file: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Height in pixels.
    #[serde(default)]
    pub height: u32,
    /// MIME type.
    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Remote URL, once offloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Attachment metadata as produced by the hosting runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// Main file, relative to the tenant uploads directory (`2024/11/a.jpg`).
    pub file: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Generated sizes, keyed by size name.
    #[serde(default)]
    pub sizes: BTreeMap<String, SizeVariant>,
    /// Remote URL of the main file, set after an edit is offloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Why attachment metadata is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataContext {
    /// First generation after upload.
    #[default]
    Create,
    /// Regeneration of an existing attachment.
    Update,
}

/// A freshly uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Absolute local path.
    pub file: PathBuf,
    /// Public URL.
    pub url: String,
    /// MIME type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Object key.
    pub key: String,
    /// Public URL of the object.
    pub remote_url: String,
    /// Bytes written.
    pub byte_size: u64,
}

/// Outcome of purging an attachment from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Key prefixes that were listed.
    pub prefixes: Vec<String>,
    /// Versions and delete markers removed.
    pub deleted: usize,
}
