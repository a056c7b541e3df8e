//! Admin approval workflow handlers.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AdminSession;
use crate::error::{AppError, AppResult};
use crate::models::{ApprovalStatus, IdentityId, Profile};
use crate::services::SessionRegistry;

#[derive(Debug, Deserialize)]
pub struct ListProfilesParams {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileListResponse {
    pub status: ApprovalStatus,
    pub profiles: Vec<Profile>,
}

/// List profiles by approval status (pending when unspecified).
///
/// GET /api/v1/profiles
pub async fn list_profiles(
    _admin: AdminSession,
    registry: web::Data<SessionRegistry>,
    query: web::Query<ListProfilesParams>,
) -> AppResult<HttpResponse> {
    let status = match query.status.as_deref() {
        None => ApprovalStatus::Pending,
        Some(raw) => ApprovalStatus::parse(raw)
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown status '{raw}'")))?,
    };

    let profiles = registry.profiles().list_by_status(status).await?;
    Ok(HttpResponse::Ok().json(ProfileListResponse { status, profiles }))
}

async fn decide(
    admin: &AdminSession,
    registry: &SessionRegistry,
    id: IdentityId,
    status: ApprovalStatus,
) -> AppResult<Profile> {
    let store = registry.profiles();

    let existing = store
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {id}")))?;
    if existing.is_admin() {
        return Err(AppError::InvalidInput(
            "Administrator profiles are not subject to approval".to_string(),
        ));
    }
    if status == ApprovalStatus::Approved && !existing.is_complete() {
        return Err(AppError::InvalidInput(
            "Profile is missing hall-ticket number, name or year".to_string(),
        ));
    }

    let profile = store.set_status(&id, status).await?;
    info!(
        admin_id = %admin.identity.id,
        profile_id = %id,
        status = %status,
        "Profile approval decided"
    );
    Ok(profile)
}

/// Approve a student profile.
///
/// POST /api/v1/profiles/{id}/approve
pub async fn approve_profile(
    admin: AdminSession,
    registry: web::Data<SessionRegistry>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = IdentityId::new(path.into_inner());
    let profile = decide(&admin, &registry, id, ApprovalStatus::Approved).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Reject a student profile.
///
/// POST /api/v1/profiles/{id}/reject
pub async fn reject_profile(
    admin: AdminSession,
    registry: web::Data<SessionRegistry>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = IdentityId::new(path.into_inner());
    let profile = decide(&admin, &registry, id, ApprovalStatus::Rejected).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Configure profile administration routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/profiles").route(web::get().to(list_profiles)))
        .service(web::resource("/profiles/{id}/approve").route(web::post().to(approve_profile)))
        .service(web::resource("/profiles/{id}/reject").route(web::post().to(reject_profile)));
}
