//! Output download handler

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiResult;
use crate::AppState;
use sheetforge_utils::{is_safe_download_name, AppError};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";

/// GET /api/download/{filename}
///
/// Unsafe names get the same 404 as absent files; no resource can exist
/// under them.
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    if !is_safe_download_name(&filename) {
        return Err(AppError::not_found("File not found").into());
    }

    let path = state.config.storage.output_dir.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::not_found("File not found"))?;

    let content_type = if filename.to_lowercase().ends_with(".xls") {
        XLS_CONTENT_TYPE
    } else {
        XLSX_CONTENT_TYPE
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
