use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_derive_error::ErrorResponse;
use thiserror::Error;
use tracing::error;

use crate::http::views::{page, Status};

pub type ApiResult<T> = Result<T, PageError>;

#[derive(Error, ErrorResponse)]
pub enum ApiError {
    #[error("Upload your documents and press OK before asking a question.")]
    #[status(StatusCode::BAD_REQUEST)]
    NoDocuments,

    #[error("{0}")]
    #[status(StatusCode::BAD_REQUEST)]
    ClientError(String),

    #[error("{0}")]
    #[status(StatusCode::UNPROCESSABLE_ENTITY)]
    Unprocessable(String),

    #[error(transparent)]
    ServerError(#[from] anyhow::Error),
}

/// An [`ApiError`] shown on the chat page instead of as a JSON body.
#[allow(clippy::module_name_repetitions)]
pub struct PageError(ApiError);

impl PageError {
    pub fn status(&self) -> StatusCode {
        self.0.status_code()
    }
}

impl<E: Into<ApiError>> From<E> for PageError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = self.0.to_string();

        if status.is_server_error() {
            error!(error_message, error_details = ?self.0, "internal server error");
        }

        (status, page(&[], &Status::Error(&error_message))).into_response()
    }
}
