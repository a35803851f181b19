use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::status::api_status))
        .route("/upload/excel", post(handlers::upload::upload_excel))
        .route("/download/:filename", get(handlers::download::download_file))
        .route("/openai/chat", post(handlers::chat::openai_chat))
        .route("/anthropic/chat", post(handlers::chat::anthropic_chat))
}
