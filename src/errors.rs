use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Failure kinds the account service can signal. Handlers never build
/// status codes themselves; the `ResponseError` impl below is the single
/// place where kinds become transport responses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("username already exists")]
    UsernameAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid number")]
    InvalidNumber,

    #[error("bad request body")]
    BadRequestBody,

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::UsernameAlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidNumber | AuthError::BadRequestBody => StatusCode::BAD_REQUEST,
            AuthError::Persistence(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Store and internal failures carry backend detail; clients only
        // ever see a generic message for those.
        let message = match self {
            AuthError::Persistence(_) | AuthError::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": message
        }))
    }
}
