use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::storage::{sanitize_filename, UploadStore};

/// Multipart field that carries uploaded files.
pub const FILES_FIELD: &str = "files";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No files part in the request")]
    NoFilesPart,
    #[error("No files uploaded")]
    NoFiles,
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            UploadError::NoFilesPart | UploadError::NoFiles => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            UploadError::Multipart(err) => (err.status(), err.body_text()),
            UploadError::Io(err) => {
                warn!(error = %err, "upload failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to store upload".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct UploadReceipt {
    pub message: &'static str,
    pub files: Vec<String>,
    pub rejected: Vec<String>,
}

/// `POST /api/upload`, reachable from any origin.
pub fn router(store: UploadStore, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(store))
}

async fn upload(
    State(store): State<Arc<UploadStore>>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, UploadError> {
    let mut saw_files_part = false;
    let mut files = Vec::new();
    let mut rejected = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            debug!(name = ?field.name(), "ignoring multipart field");
            continue;
        }
        saw_files_part = true;

        // Browsers send an empty filename when no file was chosen.
        let Some(original) = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_owned)
        else {
            continue;
        };
        let accepted = sanitize_filename(&original).filter(|name| store.accepts(name));
        let Some(name) = accepted.map(str::to_owned) else {
            info!(filename = %original, "rejected upload");
            rejected.push(original);
            continue;
        };

        let bytes = persist(&store, &name, field).await?;
        info!(filename = %name, bytes, "stored upload");
        files.push(name);
    }

    if !saw_files_part {
        return Err(UploadError::NoFilesPart);
    }
    if files.is_empty() && rejected.is_empty() {
        return Err(UploadError::NoFiles);
    }

    Ok(Json(UploadReceipt {
        message: "Files uploaded successfully",
        files,
        rejected,
    }))
}

/// Streams one field to disk, removing the file again if the stream breaks.
async fn persist(
    store: &UploadStore,
    name: &str,
    mut field: Field<'_>,
) -> Result<u64, UploadError> {
    let mut file = store.create(name).await?;

    let written = async {
        let mut written = 0u64;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok::<_, UploadError>(written)
    }
    .await;

    if written.is_err() {
        drop(file);
        if let Err(err) = store.discard(name).await {
            warn!(filename = %name, error = %err, "failed to remove partial upload");
        }
    }
    written
}
