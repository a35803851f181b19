//! Workbook upload handler
//!
//! Validates the multipart upload, saves it under a timestamped name, runs
//! the processing pipeline, and returns where to download the result. The
//! saved upload only lives for this request; a drop guard removes it on
//! every exit path.

use axum::{
    extract::{Multipart, State},
    response::Json,
};
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::AppState;
use sheetforge_utils::{
    sanitize_filename, validate_upload_extension, validate_upload_size, AppError,
};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub output_file: String,
    pub download_url: String,
}

/// Removes the temporary upload when the request ends, however it ends.
struct TempUpload {
    path: PathBuf,
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), %error, "failed to remove upload");
            }
        }
    }
}

/// POST /api/upload/excel
pub async fn upload_excel(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let processor = state
        .processor
        .as_ref()
        .ok_or_else(|| AppError::configuration("Excel processor is not configured"))?;
    let storage = &state.config.storage;

    let mut file: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(AppError::validation("No file selected").into());
        }
        validate_upload_extension(&file_name, &storage.allowed_extensions)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Failed to read file data: {}", e)))?;
        file = Some((file_name, data));
        break;
    }

    let (file_name, data) = file.ok_or_else(|| AppError::validation("No file provided"))?;
    validate_upload_size(data.len(), storage.max_upload_bytes)?;

    let saved_name = format!(
        "{}_{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        sanitize_filename(&file_name)
    );
    tokio::fs::create_dir_all(&storage.upload_dir).await?;
    let upload_path = storage.upload_dir.join(&saved_name);
    tokio::fs::write(&upload_path, &data).await?;
    let _guard = TempUpload {
        path: upload_path.clone(),
    };

    info!(
        upload = %file_name,
        saved = %saved_name,
        size = data.len(),
        "processing uploaded workbook"
    );

    tokio::fs::create_dir_all(&storage.output_dir).await?;
    let output_file = processor.process(&upload_path).await?;

    Ok(Json(UploadResponse {
        message: "File processed successfully".to_string(),
        download_url: format!("/api/download/{}", output_file),
        output_file,
    }))
}
