//! Client session API handlers.
//!
//! A browser opens a session, then drives its controller through these
//! routes using the `X-Session-Token` header.

use actix_web::{HttpResponse, web};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::ClientSession;
use crate::error::AppResult;
use crate::models::{Profile, ProfileFields, Role};
use crate::services::SessionRegistry;
use crate::session::{
    LoginOutcome, SessionSnapshot, SignUpOutcome, SignUpRequest, View, select_view,
};

/// Snapshot plus the screen it selects.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub view: View,
}

impl From<SessionSnapshot> for SessionResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        let view = select_view(&snapshot);
        Self { snapshot, view }
    }
}

/// Response to opening a session. The token is shown once.
#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_token: String,
    pub session: SessionResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    /// Wait for any in-flight profile fetch before answering
    #[serde(default)]
    pub settle: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub expected_role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub outcome: LoginOutcome,
    pub view: View,
}

#[derive(Debug, Deserialize)]
pub struct SignUpBody {
    pub email: String,
    pub password: SecretString,
    pub role: Role,
    #[serde(default)]
    pub fields: ProfileFields,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    #[serde(flatten)]
    pub outcome: SignUpOutcome,
    pub session: SessionResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub fields: ProfileFields,
}

#[derive(Debug, Serialize)]
pub struct CreateProfileResponse {
    pub profile: Profile,
    pub session: SessionResponse,
}

/// Open a client session.
///
/// POST /api/v1/session
pub async fn open_session(registry: web::Data<SessionRegistry>) -> HttpResponse {
    let (token, controller) = registry.open();
    let session = controller.settled().await;

    HttpResponse::Created().json(OpenSessionResponse {
        session_token: token.expose_secret().to_string(),
        session: session.into(),
    })
}

/// Current session state.
///
/// GET /api/v1/session
pub async fn get_session(
    session: ClientSession,
    query: web::Query<SessionQuery>,
) -> HttpResponse {
    let snapshot = if query.settle {
        session.controller.settled().await
    } else {
        session.controller.snapshot()
    };
    HttpResponse::Ok().json(SessionResponse::from(snapshot))
}

/// Sign in.
///
/// POST /api/v1/session/login
pub async fn login(
    session: ClientSession,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let outcome = session
        .controller
        .login(&req.email, &req.password, req.expected_role)
        .await?;

    let view = select_view(&outcome.snapshot);
    Ok(HttpResponse::Ok().json(LoginResponse { outcome, view }))
}

/// Create an administrator account.
///
/// POST /api/v1/session/signup
pub async fn sign_up(
    session: ClientSession,
    body: web::Json<SignUpBody>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let outcome = session
        .controller
        .sign_up(SignUpRequest {
            email: req.email,
            password: req.password,
            role: req.role,
            fields: req.fields,
        })
        .await?;

    Ok(HttpResponse::Created().json(SignUpResponse {
        outcome,
        session: session.controller.snapshot().into(),
    }))
}

/// Sign out.
///
/// POST /api/v1/session/logout
pub async fn logout(session: ClientSession) -> HttpResponse {
    session.controller.logout().await;
    HttpResponse::Ok().json(SessionResponse::from(session.controller.snapshot()))
}

/// Submit the profile form.
///
/// POST /api/v1/session/profile
pub async fn create_profile(
    session: ClientSession,
    body: web::Json<CreateProfileRequest>,
) -> AppResult<HttpResponse> {
    let profile = session
        .controller
        .create_profile(body.into_inner().fields)
        .await?;

    Ok(HttpResponse::Created().json(CreateProfileResponse {
        profile,
        session: session.controller.snapshot().into(),
    }))
}

/// Hide the profile prompt for this identity cycle.
///
/// POST /api/v1/session/profile/dismiss
pub async fn dismiss_profile_prompt(session: ClientSession) -> HttpResponse {
    session.controller.close_profile_creation_modal();
    HttpResponse::Ok().json(SessionResponse::from(session.controller.snapshot()))
}

/// Close the client session.
///
/// DELETE /api/v1/session
pub async fn close_session(
    session: ClientSession,
    registry: web::Data<SessionRegistry>,
) -> HttpResponse {
    if registry.close(&session.token) {
        info!("Client session closed by request");
    }
    HttpResponse::NoContent().finish()
}

/// Configure session routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/session")
            .route(web::post().to(open_session))
            .route(web::get().to(get_session))
            .route(web::delete().to(close_session)),
    )
    .service(web::resource("/session/login").route(web::post().to(login)))
    .service(web::resource("/session/signup").route(web::post().to(sign_up)))
    .service(web::resource("/session/logout").route(web::post().to(logout)))
    .service(web::resource("/session/profile").route(web::post().to(create_profile)))
    .service(
        web::resource("/session/profile/dismiss").route(web::post().to(dismiss_profile_prompt)),
    );
}
