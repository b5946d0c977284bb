use crate::gateway::GatewayError;
use crate::protocol::{DecodeError, EncodeError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Not found")]
    NotFound,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Encoding(#[from] EncodeError),
    #[error(transparent)]
    Decoding(#[from] DecodeError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Internal server error")]
    Internal,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            Self::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Self::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Encoding(e) => {
                tracing::debug!(error = %e, "Rejected unencodable notification");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Self::Decoding(e) => {
                tracing::error!(error = %e, "Feedback stream returned malformed data");
                (StatusCode::BAD_GATEWAY, "Feedback stream returned malformed data".to_string())
            }
            // The credential branch is the one error the triggering layer renders
            // verbatim; everything else collapses into a gateway failure.
            Self::Gateway(GatewayError::InvalidCredential(msg)) => {
                tracing::warn!(message = %msg, "Invalid gateway credential");
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            Self::Gateway(e) => {
                tracing::error!(error = %e, "Gateway unavailable");
                (StatusCode::BAD_GATEWAY, "Push gateway unavailable".to_string())
            }
            Self::Internal => {
                tracing::error!("Internal server error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
