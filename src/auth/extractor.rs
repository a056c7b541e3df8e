//! Actix-web extractors for client-session authentication.
//!
//! # Security
//! - The session token from the header is wrapped in `SecretString` immediately
//! - Tokens are never logged; the registry only sees their hash

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use futures_util::future::LocalBoxFuture;
use secrecy::SecretString;
use std::future::{Ready, ready};

use crate::config::SESSION_TOKEN_HEADER;
use crate::error::ErrorResponse;
use crate::models::Identity;
use crate::services::SessionRegistry;
use crate::session::SessionController;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AuthError {
    fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED",
            message: message.into(),
        }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "FORBIDDEN",
            message: message.into(),
        }
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: "Internal configuration error".to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(ErrorResponse {
            error: self.code.to_string(),
            message: self.message.clone(),
        })
    }
}

/// Extractor that requires a known client session.
///
/// ```ignore
/// async fn handler(session: ClientSession) -> impl Responder {
///     session.controller.snapshot()
/// }
/// ```
pub struct ClientSession {
    pub token: SecretString,
    pub controller: SessionController,
}

fn resolve_session(req: &HttpRequest) -> Result<ClientSession, AuthError> {
    let registry = req
        .app_data::<web::Data<SessionRegistry>>()
        .ok_or_else(AuthError::internal)?;

    let token = extract_secret_header(req, SESSION_TOKEN_HEADER).ok_or_else(|| {
        AuthError::unauthorized(format!(
            "Missing session token. Provide {SESSION_TOKEN_HEADER} header."
        ))
    })?;

    let controller = registry
        .get(&token)
        .ok_or_else(|| AuthError::unauthorized("Unknown or expired session"))?;

    Ok(ClientSession { token, controller })
}

impl FromRequest for ClientSession {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve_session(req))
    }
}

/// Extractor that requires a client session signed in with an admin profile.
pub struct AdminSession {
    pub identity: Identity,
    pub controller: SessionController,
}

impl FromRequest for AdminSession {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = resolve_session(req);

        Box::pin(async move {
            let session = session?;
            // Decide on the resolved profile, not a transient Loading state
            let snapshot = session.controller.settled().await;
            // Closed or swept while we waited
            if !session.controller.is_running() {
                return Err(AuthError::unauthorized("Unknown or expired session"));
            }
            let identity = snapshot
                .identity
                .ok_or_else(|| AuthError::unauthorized("Sign in first"))?;

            match snapshot.profile {
                Some(profile) if profile.is_admin() => Ok(AdminSession {
                    identity,
                    controller: session.controller,
                }),
                _ => Err(AuthError::forbidden("Administrator profile required")),
            }
        })
    }
}
