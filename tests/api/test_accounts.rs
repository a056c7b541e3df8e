//! Account provisioning over HTTP and across server restarts.

use std::sync::Arc;

use dept_portal_lib::db::DbPool;
use dept_portal_lib::store::{AccountStore, DatabaseAccountStore, DatabaseProfileStore, ProfileStore};
use serde_json::json;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_admin_created_student_signs_in_and_submits_profile() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = sign_up_admin(&app, "hod@x.edu").await;

    let (status, body) = create_account(&app, &admin, "new@x.edu", "student").await;
    assert_eq!(status, 201, "{body:?}");
    assert_eq!(body["identity"]["email"], "new@x.edu");
    assert!(body["profile"].is_null());

    let token = open_session(&app).await;
    let (status, body) = login(&app, &token, "new@x.edu", "student").await;
    assert_eq!(status, 200, "{body:?}");
    assert!(body["navigation"].is_null());
    assert_eq!(body["notice"]["level"], "info");
    assert_eq!(body["view"], "profile_creation");

    let (status, body) = post(
        &app,
        "/api/v1/session/profile",
        Some(&token),
        json!({ "fields": { "ht_no": "20A1", "student_name": "Jane", "year": "2" } }),
    )
    .await;
    assert_eq!(status, 201, "{body:?}");
    assert_eq!(body["profile"]["status"], "pending");
    assert_eq!(body["session"]["needs_profile_creation"], false);

    let (_, body) = get(&app, "/api/v1/profiles?status=pending", Some(&admin)).await;
    assert_eq!(body["profiles"][0]["ht_no"], "20A1");
}

#[actix_rt::test]
async fn test_bootstrap_admin_is_provisioned_on_first_sign_in() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = sign_up_admin(&app, "hod@x.edu").await;

    let (status, body) = create_account(&app, &admin, "admin@vignanits.ac.in", "admin").await;
    assert_eq!(status, 201, "{body:?}");
    assert!(body["profile"].is_null());

    let token = open_session(&app).await;
    let (status, body) = login(&app, &token, "admin@vignanits.ac.in", "admin").await;
    assert_eq!(status, 200, "{body:?}");
    assert_eq!(body["navigation"], "admin_dashboard");
    assert_eq!(body["snapshot"]["profile"]["role"], "admin");
    assert_eq!(body["snapshot"]["needs_profile_creation"], false);
}

#[actix_rt::test]
async fn test_created_admin_lands_on_dashboard() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = sign_up_admin(&app, "hod@x.edu").await;

    let (status, body) = create_account(&app, &admin, "dean@x.edu", "admin").await;
    assert_eq!(status, 201, "{body:?}");
    assert_eq!(body["profile"]["status"], "approved");

    let token = open_session(&app).await;
    let (_, body) = login(&app, &token, "dean@x.edu", "admin").await;
    assert_eq!(body["view"], "admin_dashboard");
}

#[actix_rt::test]
async fn test_account_creation_requires_admin() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = sign_up_admin(&app, "hod@x.edu").await;
    create_account(&app, &admin, "new@x.edu", "student").await;

    let anonymous = open_session(&app).await;
    let (status, _) = create_account(&app, &anonymous, "x@x.edu", "student").await;
    assert_eq!(status, 401);

    let student = open_session(&app).await;
    login(&app, &student, "new@x.edu", "student").await;
    let (status, body) = create_account(&app, &student, "x@x.edu", "admin").await;
    assert_eq!(status, 403, "{body:?}");
}

#[actix_rt::test]
async fn test_duplicate_account_is_conflict() {
    let registry = create_registry();
    let app = create_test_app(&registry).await;
    let admin = sign_up_admin(&app, "hod@x.edu").await;

    create_account(&app, &admin, "new@x.edu", "student").await;
    let (status, body) = create_account(&app, &admin, "New@X.edu", "student").await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "auth/email-already-in-use");
}

#[actix_rt::test]
async fn test_accounts_and_profiles_survive_restart() {
    let pool = DbPool::connect("sqlite::memory:").await.expect("connect");
    pool.run_migrations().await.expect("migrate");
    let accounts = || Arc::new(DatabaseAccountStore::new(pool.clone())) as Arc<dyn AccountStore>;
    let profiles = || Arc::new(DatabaseProfileStore::new(pool.clone())) as Arc<dyn ProfileStore>;

    let first = create_registry_with(accounts(), profiles());
    let app = create_test_app(&first).await;
    let admin = sign_up_admin(&app, "hod@x.edu").await;
    let (_, body) = get(&app, "/api/v1/session", Some(&admin)).await;
    let admin_id = body["identity"]["id"].as_str().expect("identity id").to_string();
    first.close_all();

    // A new process over the same database
    let second = create_registry_with(accounts(), profiles());
    let app = create_test_app(&second).await;
    let token = open_session(&app).await;
    let (status, body) = login(&app, &token, "hod@x.edu", "admin").await;
    assert_eq!(status, 200, "{body:?}");
    assert_eq!(body["identity"]["id"], admin_id.as_str());
    assert_eq!(body["navigation"], "admin_dashboard");
}
