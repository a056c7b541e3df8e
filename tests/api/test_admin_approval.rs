//! Admin approval workflow over HTTP.

use serde_json::json;

use super::test_helpers::*;

/// Sign up an administrator on a fresh session.
async fn admin_session<S>(app: &S) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    sign_up_admin(app, "hod@x.edu").await
}

/// Create a student account, sign in and submit a profile, returning
/// (token, identity id).
async fn pending_student<S>(app: &S, admin: &str, email: &str) -> (String, String)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    submit_profile(
        app,
        admin,
        email,
        json!({ "ht_no": "20A1", "student_name": "Jane", "year": "2" }),
    )
    .await
}

async fn submit_profile<S>(
    app: &S,
    admin: &str,
    email: &str,
    fields: serde_json::Value,
) -> (String, String)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, body) = create_account(app, admin, email, "student").await;
    assert_eq!(status, 201, "{body:?}");
    let token = open_session(app).await;
    login(app, &token, email, "student").await;
    let (status, body) = post(
        app,
        "/api/v1/session/profile",
        Some(&token),
        json!({ "fields": fields }),
    )
    .await;
    assert_eq!(status, 201, "{body:?}");
    let id = body["profile"]["id"].as_str().expect("profile id").to_string();
    (token, id)
}

#[actix_rt::test]
async fn test_admin_approves_pending_student() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = admin_session(&app).await;
    let (student, student_id) = pending_student(&app, &admin, "jane@x.edu").await;

    let (status, body) = get(&app, "/api/v1/profiles?status=pending", Some(&admin)).await;
    assert_eq!(status, 200, "{body:?}");
    let listed: Vec<&str> = body["profiles"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(listed, vec![student_id.as_str()]);

    let (status, body) = post(
        &app,
        &format!("/api/v1/profiles/{student_id}/approve"),
        Some(&admin),
        json!({}),
    )
    .await;
    assert_eq!(status, 200, "{body:?}");
    assert_eq!(body["status"], "approved");

    // Next login picks up the decision
    post(&app, "/api/v1/session/logout", Some(&student), json!({})).await;
    let (status, body) = login(&app, &student, "jane@x.edu", "student").await;
    assert_eq!(status, 200);
    assert_eq!(body["navigation"], "student_dashboard");
    assert_eq!(body["view"], "student_dashboard");
}

#[actix_rt::test]
async fn test_admin_rejects_student() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = admin_session(&app).await;
    let (_, student_id) = pending_student(&app, &admin, "jane@x.edu").await;

    let (status, body) = post(
        &app,
        &format!("/api/v1/profiles/{student_id}/reject"),
        Some(&admin),
        json!({}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "rejected");

    let (_, body) = get(&app, "/api/v1/profiles?status=rejected", Some(&admin)).await;
    assert_eq!(body["profiles"].as_array().map(Vec::len), Some(1));
}

#[actix_rt::test]
async fn test_students_cannot_use_admin_routes() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = admin_session(&app).await;
    let (student, student_id) = pending_student(&app, &admin, "jane@x.edu").await;

    let (status, body) = get(&app, "/api/v1/profiles", Some(&student)).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, _) = post(
        &app,
        &format!("/api/v1/profiles/{student_id}/approve"),
        Some(&student),
        json!({}),
    )
    .await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_signed_out_session_is_unauthorized_for_admin_routes() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let token = open_session(&app).await;

    let (status, _) = get(&app, "/api/v1/profiles", Some(&token)).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_unknown_profile_and_bad_status() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = admin_session(&app).await;

    let (status, body) = post(&app, "/api/v1/profiles/nobody/approve", Some(&admin), json!({})).await;
    assert_eq!(status, 404, "{body:?}");

    let (status, body) = get(&app, "/api/v1/profiles?status=maybe", Some(&admin)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_admin_profiles_are_not_subject_to_approval() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = admin_session(&app).await;

    let (_, body) = get(&app, "/api/v1/session", Some(&admin)).await;
    let admin_id = body["profile"]["id"].as_str().unwrap().to_string();

    let (status, _) = post(
        &app,
        &format!("/api/v1/profiles/{admin_id}/reject"),
        Some(&admin),
        json!({}),
    )
    .await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
async fn test_incomplete_profile_cannot_be_approved() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = admin_session(&app).await;
    let (_, student_id) =
        submit_profile(&app, &admin, "jane@x.edu", json!({ "ht_no": "20A1", "student_name": "Jane" }))
            .await;

    let (status, body) = post(
        &app,
        &format!("/api/v1/profiles/{student_id}/approve"),
        Some(&admin),
        json!({}),
    )
    .await;
    assert_eq!(status, 400, "{body:?}");
    assert_eq!(body["error"], "INVALID_INPUT");

    // Rejecting an incomplete profile is still allowed
    let (status, body) = post(
        &app,
        &format!("/api/v1/profiles/{student_id}/reject"),
        Some(&admin),
        json!({}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "rejected");
}
