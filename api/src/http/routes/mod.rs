use axum::{
    routing::{get, post},
    Json, Router,
};
use std::env;

use crate::{
    axum::state::AppState,
    http::controllers::{ChatController, DocumentController},
};

pub fn mount() -> Router<AppState> {
    Router::new()
        .route("/", get(ChatController::show))
        .route("/ask", post(ChatController::ask))
        .route("/documents", post(DocumentController::store))
        .route("/version", get(version))
}

#[derive(serde::Serialize)]
struct PdfChatVersion {
    semver: String,
    rev: Option<String>,
    compile_time: String,
}

#[allow(clippy::unused_async)]
async fn version() -> Json<PdfChatVersion> {
    Json(PdfChatVersion {
        rev: env::var("GIT_REV").ok(),
        semver: env!("CARGO_PKG_VERSION").to_string(),
        compile_time: env!("STATIC_BUILD_DATE").to_string(),
    })
}
