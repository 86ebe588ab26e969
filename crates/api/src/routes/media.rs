//! Media lifecycle endpoints.
//!
//! Each route corresponds to one upload lifecycle event of the hosting
//! runtime. When the object store is not configured the payload comes back
//! unchanged.

use std::path::{Path, PathBuf};

use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use serde::{Deserialize, Serialize};
use wharf_core::offload::{
    AttachmentMetadata, MediaOffloader, MetadataContext, PurgeReport, UploadResult, UploadedFile,
};
use wharf_core::storage::ObjectStore;
use wharf_core::tenant::TenantDirectory;
use wharf_shared::AppError;

use crate::error::ApiResult;
use crate::{AppState, middleware::CurrentTenant};

/// Creates the media routes.
pub fn routes<D, S>() -> Router<AppState<D, S>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    Router::new()
        .route("/media/uploads", post(handle_upload::<D, S>))
        .route(
            "/media/metadata",
            post(generate_metadata::<D, S>).put(update_metadata::<D, S>),
        )
        .route("/media/edited", post(edited_image::<D, S>))
        .route("/media/delete", post(delete_attachment::<D, S>))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the metadata-generated event.
#[derive(Debug, Deserialize)]
pub struct GenerateMetadataRequest {
    /// Generated attachment metadata.
    pub metadata: AttachmentMetadata,
    /// Absolute local path of the main file.
    pub attached_file: PathBuf,
    /// Create or update.
    #[serde(default)]
    pub context: MetadataContext,
}

/// Request body for the metadata-updated event.
#[derive(Debug, Deserialize)]
pub struct UpdateMetadataRequest {
    /// Updated attachment metadata.
    pub metadata: AttachmentMetadata,
    /// Absolute local path of the original main file.
    pub attached_file: PathBuf,
}

/// Request body for the image-editor-save event.
#[derive(Debug, Deserialize)]
pub struct EditedImageRequest {
    /// Absolute local path the editor wrote.
    pub file: PathBuf,
    /// MIME type of the saved image.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Response for the image-editor-save event.
#[derive(Debug, Serialize)]
pub struct EditedImageResponse {
    /// The stored object, absent when nothing was uploaded.
    pub uploaded: Option<UploadResult>,
}

/// Request body for the attachment-deleted event.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    /// Metadata of the deleted attachment.
    pub metadata: AttachmentMetadata,
}

/// Response for the attachment-deleted event.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// What was purged, absent when nothing was.
    pub purged: Option<PurgeReport>,
}

/// Rejects paths outside the uploads directory.
fn ensure_within_uploads<S: ObjectStore>(
    offloader: &MediaOffloader<S>,
    path: &Path,
) -> ApiResult<()> {
    if offloader.is_within_uploads(path) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} is outside the uploads directory",
            path.display()
        ))
        .into())
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/media/uploads`
/// Offloads a fresh upload and returns it with the remote URL.
async fn handle_upload<D, S>(
    State(state): State<AppState<D, S>>,
    CurrentTenant(ctx): CurrentTenant,
    Json(file): Json<UploadedFile>,
) -> ApiResult<Json<UploadedFile>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    ensure_within_uploads(&state.offloader, &file.file)?;
    Ok(Json(state.offloader.handle_upload(&ctx, file).await))
}

/// POST `/media/metadata`
/// Offloads every generated size.
async fn generate_metadata<D, S>(
    State(state): State<AppState<D, S>>,
    CurrentTenant(ctx): CurrentTenant,
    Json(payload): Json<GenerateMetadataRequest>,
) -> ApiResult<Json<AttachmentMetadata>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    ensure_within_uploads(&state.offloader, &payload.attached_file)?;
    let metadata = state
        .offloader
        .offload_metadata(
            &ctx,
            payload.metadata,
            &payload.attached_file,
            payload.context,
        )
        .await;
    Ok(Json(metadata))
}

/// PUT `/media/metadata`
/// Offloads an edited image and its sizes.
async fn update_metadata<D, S>(
    State(state): State<AppState<D, S>>,
    CurrentTenant(ctx): CurrentTenant,
    Json(payload): Json<UpdateMetadataRequest>,
) -> ApiResult<Json<AttachmentMetadata>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    ensure_within_uploads(&state.offloader, &payload.attached_file)?;
    let metadata = state
        .offloader
        .update_metadata(&ctx, payload.metadata, &payload.attached_file)
        .await;
    Ok(Json(metadata))
}

/// POST `/media/edited`
async fn edited_image<D, S>(
    State(state): State<AppState<D, S>>,
    CurrentTenant(ctx): CurrentTenant,
    Json(payload): Json<EditedImageRequest>,
) -> ApiResult<Json<EditedImageResponse>>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    ensure_within_uploads(&state.offloader, &payload.file)?;
    let uploaded = state
        .offloader
        .offload_edited_image(&ctx, &payload.file, payload.mime_type.as_deref())
        .await;
    Ok(Json(EditedImageResponse { uploaded }))
}

/// POST `/media/delete`
/// Purges every stored version of the attachment.
async fn delete_attachment<D, S>(
    State(state): State<AppState<D, S>>,
    CurrentTenant(ctx): CurrentTenant,
    Json(payload): Json<DeleteRequest>,
) -> Json<DeleteResponse>
where
    D: TenantDirectory + 'static,
    S: ObjectStore + 'static,
{
    let purged = state.offloader.delete(&ctx, &payload.metadata).await;
    Json(DeleteResponse { purged })
}
