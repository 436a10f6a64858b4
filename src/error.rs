use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Domain failures for the auth operations, plus a catch-all for
/// unexpected faults (store, mail, signing). Expected failures carry
/// the message shown to the client; internal details of `Internal`
/// are logged and never echoed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    Conflict,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired verification code")]
    InvalidOrExpiredCode,

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredResetToken,

    #[error("Unauthorized - no token provided")]
    NoToken,

    #[error("Unauthorized - invalid token")]
    InvalidSession,

    #[error("User not found")]
    NotFound,

    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Conflict
            | Self::InvalidCredentials
            | Self::InvalidOrExpiredCode
            | Self::InvalidOrExpiredResetToken
            | Self::NotFound => StatusCode::BAD_REQUEST,

            Self::NoToken | Self::InvalidSession => StatusCode::UNAUTHORIZED,

            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref e) = self {
            error!(error = %e, "internal fault");
        }
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            AuthError::Validation("All fields are required".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::Conflict.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::NoToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidSession.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Internal(anyhow::anyhow!("pool closed")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_message_is_generic() {
        let err = AuthError::Internal(anyhow::anyhow!("password=hunter2 leaked"));
        assert_eq!(err.to_string(), "Server error");
    }

    #[test]
    fn credential_failures_are_indistinguishable() {
        // Unknown email and wrong password both map to this variant, so the
        // client-visible message and status can never leak which one it was.
        let err = AuthError::InvalidCredentials;
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
