use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_sessions::extractors::ReadableSession;
use uuid::Uuid;

use crate::axum::{
    errors::{ApiError, PageError},
    session::CONVERSATION_KEY,
    state::{AppState, SharedChain},
};

/// The chain belonging to the current session, if documents were processed.
pub struct Conversation {
    pub id: Option<Uuid>,
    pub chain: Option<SharedChain>,
}

#[async_trait]
impl FromRequestParts<AppState> for Conversation {
    type Rejection = PageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extract::<ReadableSession>()
            .await
            .map_err(|_| ApiError::ServerError(anyhow::anyhow!("Session layer missing")))?;

        let Some(id) = session.get::<Uuid>(CONVERSATION_KEY) else {
            return Ok(Self { id: None, chain: None });
        };
        drop(session);

        Ok(Self {
            id: Some(id),
            chain: state.conversation(&id).await,
        })
    }
}
