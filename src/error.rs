use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Malformed webhook payload: {cause}")]
    MalformedPayload { cause: String },

    #[error("LINE API call {operation} failed: {cause}")]
    Messaging { operation: String, cause: String },

    #[error("Persistence failed: {cause}")]
    Persistence { cause: String },

    #[error("Connection to user store failed: {cause}")]
    ConnectionFailed { cause: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl BotError {
    pub fn messaging(operation: &str, cause: impl ToString) -> Self {
        BotError::Messaging {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn persistence(cause: impl ToString) -> Self {
        BotError::Persistence {
            cause: cause.to_string(),
        }
    }
}

impl IntoResponse for BotError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            BotError::InvalidSignature => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "invalid_signature".to_string(),
                    message: "X-Line-Signature does not match the request body".to_string(),
                    cause: None,
                },
            ),
            BotError::InvalidRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "invalid_request".to_string(),
                    message: message.clone(),
                    cause: None,
                },
            ),
            BotError::MalformedPayload { cause } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "malformed_payload".to_string(),
                    message: "Webhook body is not a valid event payload".to_string(),
                    cause: Some(cause.clone()),
                },
            ),
            BotError::Messaging { operation, .. } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: "messaging_failed".to_string(),
                    message: format!("LINE API call '{}' failed", operation),
                    cause: None,
                },
            ),
            BotError::Persistence { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "persistence_failed".to_string(),
                    message: "Failed to store user record".to_string(),
                    cause: None,
                },
            ),
            BotError::ConnectionFailed { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "connection_failed".to_string(),
                    message: "User store is unavailable".to_string(),
                    cause: None,
                },
            ),
            BotError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "Internal server error".to_string(),
                    cause: None,
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        (status, Json(error_response)).into_response()
    }
}

impl From<tokio_postgres::Error> for BotError {
    fn from(err: tokio_postgres::Error) -> Self {
        BotError::persistence(err)
    }
}

impl From<deadpool_postgres::PoolError> for BotError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        BotError::ConnectionFailed {
            cause: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
