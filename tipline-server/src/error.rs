//! Service error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use tipline_core::Error as IdentityError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("Email not found")]
    EmailNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Password too short (minimum 8 characters)")]
    PasswordTooShort,

    #[error("Password too long (maximum 80 characters)")]
    PasswordTooLong,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Identity(err) => match err {
                IdentityError::EmailAlreadyTaken(_) => StatusCode::CONFLICT,
                IdentityError::MalformedAddress(_)
                | IdentityError::TooManyEmailAddresses { .. }
                | IdentityError::EmailNotVerified(_)
                | IdentityError::CannotRemovePrimaryEmail(_)
                | IdentityError::InvalidUsername(_) => StatusCode::BAD_REQUEST,
            },
            ServiceError::ParticipantNotFound | ServiceError::EmailNotFound => {
                StatusCode::NOT_FOUND
            }
            ServiceError::EmailAlreadyExists | ServiceError::UsernameTaken => StatusCode::CONFLICT,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::NotAuthenticated => StatusCode::FORBIDDEN,
            ServiceError::PasswordTooShort
            | ServiceError::PasswordTooLong
            | ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = match &self {
            ServiceError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({ "success": false, "reason": reason });
        (status, axum::Json(body)).into_response()
    }
}
