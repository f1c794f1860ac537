use anyhow::Context;
use axum::{response::Html, Form};

use crate::{
    axum::{
        errors::{ApiError, ApiResult},
        extractors::Conversation,
    },
    http::views::{page, Status},
};

pub async fn show(conversation: Conversation) -> Html<String> {
    let history = match conversation.chain {
        Some(chain) => chain.lock().await.memory().messages().to_vec(),
        None => Vec::new(),
    };

    page(&history, &Status::Idle)
}

#[derive(Debug, serde::Deserialize)]
pub struct AskRequest {
    question: String,
}

pub async fn ask(
    conversation: Conversation,
    Form(AskRequest { question }): Form<AskRequest>,
) -> ApiResult<Html<String>> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ApiError::ClientError("Ask a question first.".to_string()).into());
    }

    let chain = conversation.chain.ok_or(ApiError::NoDocuments)?;
    let response = chain
        .lock()
        .await
        .call(question)
        .await
        .context("Failed to answer the question.")?;

    Ok(page(&response.chat_history, &Status::Idle))
}
