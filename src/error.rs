//! Domain error types for the department portal.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Rejection returned by the identity provider.
///
/// Carried to the caller verbatim: the code is provider-defined and the
/// message is meant for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct CredentialError {
    pub code: String,
    pub message: String,
}

impl CredentialError {
    pub const INVALID_EMAIL: &'static str = "auth/invalid-email";
    pub const WEAK_PASSWORD: &'static str = "auth/weak-password";
    pub const EMAIL_IN_USE: &'static str = "auth/email-already-in-use";
    pub const INVALID_CREDENTIAL: &'static str = "auth/invalid-credential";
    pub const UNAVAILABLE: &'static str = "auth/network-request-failed";

    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Profile and account store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A record already exists under this key
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// No record exists under this key
    #[error("{0} not found")]
    NotFound(String),

    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected the query
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Infrastructure failures, as opposed to answers about the data.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Database(_))
    }
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(e) => StoreError::Unavailable(e.to_string()),
            sea_orm::DbErr::ConnectionAcquire(e) => StoreError::Unavailable(e.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Convenience type alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the session controller's operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Identity provider rejected the credentials
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Operation needs a signed-in identity
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Profile store rejected a create/update
    #[error("Profile write failed: {0}")]
    ProfileWrite(#[source] StoreError),

    /// Students cannot self-register through sign-up
    #[error("Student accounts are created by signing in and completing the profile form")]
    StudentSignUpRejected,

    /// Controller has been stopped
    #[error("Session controller has been stopped")]
    Stopped,
}

/// Application-level errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, String) {
        match self {
            AppError::Session(SessionError::Credential(cred)) => {
                let status = match cred.code.as_str() {
                    CredentialError::EMAIL_IN_USE => StatusCode::CONFLICT,
                    CredentialError::INVALID_CREDENTIAL => StatusCode::UNAUTHORIZED,
                    CredentialError::UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, cred.code.clone())
            }
            AppError::Session(SessionError::NotAuthenticated) => {
                (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED".to_string())
            }
            AppError::Session(SessionError::ProfileWrite(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PROFILE_WRITE_ERROR".to_string(),
            ),
            AppError::Session(SessionError::StudentSignUpRejected) => (
                StatusCode::FORBIDDEN,
                "STUDENT_SIGNUP_REJECTED".to_string(),
            ),
            AppError::Session(SessionError::Stopped) => {
                (StatusCode::GONE, "SESSION_CLOSED".to_string())
            }
            AppError::Store(StoreError::NotFound(_)) | AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND".to_string())
            }
            AppError::Store(StoreError::AlreadyExists(_)) => {
                (StatusCode::CONFLICT, "ALREADY_EXISTS".to_string())
            }
            AppError::Store(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_ERROR".to_string(),
            ),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT".to_string()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status, error_code) = self.status_and_code();

        let message = match self {
            AppError::Session(SessionError::Credential(cred)) => cred.message.clone(),
            AppError::Store(err) if err.is_transient() => {
                tracing::error!("Profile store error: {}", err);
                "The store is temporarily unavailable".to_string()
            }
            AppError::Session(SessionError::ProfileWrite(err)) => {
                tracing::warn!("Profile write failed: {}", err);
                self.to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code,
            message,
        })
    }
}

/// Error response body.
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}
