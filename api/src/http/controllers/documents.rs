use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    response::Html,
};
use axum_sessions::extractors::WritableSession;
use pdfchat::PdfFile;
use std::sync::Arc;
use tracing::{info, warn};

use crate::axum::{
    errors::{ApiError, ApiResult},
    session::CONVERSATION_KEY,
    state::AppState,
};
use crate::http::views::{page, Status};

pub const UPLOAD_FIELD: &str = "pdfs";

/// Processes the uploaded PDFs and starts a fresh conversation over them.
pub async fn store(
    State(state): State<AppState>,
    mut session: WritableSession,
    mut multipart: Multipart,
) -> ApiResult<Html<String>> {
    let files = read_uploads(&mut multipart).await?;
    if files.is_empty() {
        let err = ApiError::ClientError("Choose your PDF files and press OK.".to_string());
        return Err(err.into());
    }
    let file_count = files.len();

    let vector_store = state
        .pipeline
        .build_vector_store(files)
        .await
        .map_err(|err| {
            warn!("Failed to process uploaded PDFs: {err:#}");
            ApiError::Unprocessable(format!("Failed to process your PDFs: {err:#}"))
        })?;
    let chunks = vector_store.len();
    let chain = state.pipeline.conversation_chain(Arc::new(vector_store));

    let previous = session.get(CONVERSATION_KEY);
    let id = state.start_conversation(chain, previous).await;
    session
        .insert(CONVERSATION_KEY, id)
        .context("Failed to store the conversation in the session.")?;

    info!(
        "Started conversation {id} over {file_count} files, {} active",
        state.conversation_count().await
    );

    Ok(page(
        &[],
        &Status::Done {
            chunks,
            files: file_count,
        },
    ))
}

async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<PdfFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::ClientError(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::ClientError(e.to_string()))?;

        // Browsers send an empty part when no file was picked.
        if name.is_empty() && bytes.is_empty() {
            continue;
        }

        if !name.to_lowercase().ends_with(".pdf") {
            return Err(ApiError::ClientError(format!("{name} is not a PDF file.")));
        }

        files.push(PdfFile::new(name, bytes.to_vec()));
    }

    Ok(files)
}
