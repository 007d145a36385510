//! Error types for voidd.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum VoidError {
    #[error("no message provided")]
    EmptyMessage,

    #[error("message exceeds {max} characters")]
    MessageTooLong { max: usize },

    #[error("error parsing form: {0}")]
    Form(#[from] MultipartError),

    #[error("error getting session ID: {0}")]
    Session(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IntoResponse for VoidError {
    fn into_response(self) -> Response {
        let status = match &self {
            VoidError::EmptyMessage => StatusCode::BAD_REQUEST,
            VoidError::MessageTooLong { .. } => StatusCode::BAD_REQUEST,
            VoidError::Form(_) => StatusCode::BAD_REQUEST,
            VoidError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VoidError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
