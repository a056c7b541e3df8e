//! Bootstrap administrator provisioning.

use std::sync::atomic::Ordering;

use dept_portal_lib::config::BOOTSTRAP_ADMIN_EMAIL;
use dept_portal_lib::models::{ApprovalStatus, Role};
use dept_portal_lib::session::{Navigation, SessionEvent, View, select_view};
use dept_portal_lib::store::ProfileStore;

use super::test_helpers::*;

/// (7) First bootstrap sign-in provisions an approved admin and routes to the admin view.
#[tokio::test]
async fn test_bootstrap_admin_is_provisioned_on_first_login() {
    let h = Harness::start().await;
    let identity = h.register(BOOTSTRAP_ADMIN_EMAIL).await;
    let mut events = h.controller.events().subscribe();

    let outcome = h
        .controller
        .login(BOOTSTRAP_ADMIN_EMAIL, &secret(PASSWORD), Role::Admin)
        .await
        .expect("login");

    assert_eq!(outcome.navigation, Some(Navigation::AdminDashboard));

    let profile = outcome.snapshot.profile.expect("admin profile");
    assert_eq!(profile.role, Role::Admin);
    assert_eq!(profile.status, ApprovalStatus::Approved);

    let snapshot = h.controller.settled().await;
    assert!(!snapshot.needs_profile_creation);
    assert_eq!(select_view(&snapshot), View::AdminDashboard);

    let stored = h.store.get(&identity.id).await.unwrap().expect("stored");
    assert_eq!(stored.role, Role::Admin);
    assert_eq!(stored.status, ApprovalStatus::Approved);

    assert!(
        drain_events(&mut events).contains(&SessionEvent::Navigate(Navigation::AdminDashboard))
    );
}

/// (2) Repeated sign-ins leave exactly one admin profile.
#[tokio::test]
async fn test_bootstrap_admin_is_not_duplicated() {
    let h = Harness::start().await;
    h.register(BOOTSTRAP_ADMIN_EMAIL).await;

    h.controller
        .login(BOOTSTRAP_ADMIN_EMAIL, &secret(PASSWORD), Role::Admin)
        .await
        .expect("first login");
    h.controller.settled().await;
    h.controller.logout().await;

    h.controller
        .login(BOOTSTRAP_ADMIN_EMAIL, &secret(PASSWORD), Role::Admin)
        .await
        .expect("second login");
    h.controller.settled().await;
    h.drain().await;

    assert_eq!(h.store.profile_count(), 1);
    assert_eq!(h.store.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bootstrap_email_matches_case_insensitively() {
    let h = Harness::start().await;
    h.register(BOOTSTRAP_ADMIN_EMAIL).await;

    let outcome = h
        .controller
        .login("  Admin@VignanITS.ac.in ", &secret(PASSWORD), Role::Admin)
        .await
        .expect("login");

    assert_eq!(outcome.navigation, Some(Navigation::AdminDashboard));
}

#[tokio::test]
async fn test_bootstrap_via_listener_alone() {
    let h = Harness::start().await;
    h.register(BOOTSTRAP_ADMIN_EMAIL).await;

    h.sign_in_externally(BOOTSTRAP_ADMIN_EMAIL).await;
    let snapshot = h.controller.settled().await;

    assert_eq!(snapshot.profile.map(|p| p.role), Some(Role::Admin));
    assert!(!snapshot.needs_profile_creation);
    assert_eq!(h.store.profile_count(), 1);
}

#[tokio::test]
async fn test_other_addresses_are_never_provisioned() {
    let h = Harness::start().await;
    h.register("admin@other.edu").await;

    h.controller
        .login("admin@other.edu", &secret(PASSWORD), Role::Admin)
        .await
        .expect("login");
    h.controller.settled().await;
    h.drain().await;

    assert_eq!(h.store.profile_count(), 0);
    assert_eq!(h.store.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bootstrap_write_failure_leaves_no_profile_and_no_prompt() {
    let h = Harness::start().await;
    h.register(BOOTSTRAP_ADMIN_EMAIL).await;
    h.store.fail_writes(true);

    let outcome = h
        .controller
        .login(BOOTSTRAP_ADMIN_EMAIL, &secret(PASSWORD), Role::Admin)
        .await
        .expect("login still succeeds");

    assert_eq!(outcome.navigation, None);
    let snapshot = h.controller.settled().await;
    assert!(snapshot.profile.is_none());
    assert!(!snapshot.needs_profile_creation);
    assert_eq!(h.store.profile_count(), 0);
}
