//! Account provisioning by administrators.

use actix_web::{HttpResponse, web};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;

use crate::auth::AdminSession;
use crate::error::AppResult;
use crate::models::Role;
use crate::services::{SessionRegistry, create_account};

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub role: Role,
}

/// Create an account for a student or another administrator.
///
/// POST /api/v1/accounts
pub async fn create(
    admin: AdminSession,
    registry: web::Data<SessionRegistry>,
    body: web::Json<CreateAccountRequest>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    let created = create_account(
        registry.directory(),
        registry.profiles().as_ref(),
        &body.email,
        &body.password,
        body.role,
    )
    .await?;

    info!(
        admin_id = %admin.identity.id,
        identity_id = %created.identity.id,
        role = %created.role,
        "Account provisioned by administrator"
    );
    Ok(HttpResponse::Created().json(created))
}

/// Configure account routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/accounts").route(web::post().to(create)));
}
