use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use sheetforge_utils::{AppError, ErrorResponse};

/// Handler-facing error wrapper: carries the shared taxonomy and renders it
/// as the service-wide JSON error body.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = self.0.error_code(), error = %self.0, "request failed");
        } else {
            tracing::warn!(code = self.0.error_code(), error = %self.0, "request rejected");
        }

        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(error: E) -> Self {
        Self(error.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body extractor whose rejections speak the service's error shape:
/// a body that fails to parse or deserialize is a validation error, not
/// axum's plain-text 422.
pub struct BodyJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for BodyJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError(AppError::validation(rejection.body_text())))?;
        Ok(Self(value))
    }
}
