//! Profile reads that fail: retried, then reported as "absent, fetch failed".

use std::sync::atomic::Ordering;

use dept_portal_lib::models::Role;
use dept_portal_lib::session::{Navigation, NoticeLevel};

use super::test_helpers::*;

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let h = Harness::start().await;
    h.register_with_profile("ok@x.edu", approved_student()).await;
    h.store.fail_next_gets(2);

    h.sign_in_externally("ok@x.edu").await;
    let snapshot = h.controller.settled().await;

    assert!(snapshot.profile.is_some());
    assert!(!snapshot.profile_fetch_failed);
    assert_eq!(h.store.gets.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_mark_fetch_failed() {
    let h = Harness::start().await;
    h.register_with_profile("ok@x.edu", approved_student()).await;
    h.store.fail_next_gets(3);

    h.sign_in_externally("ok@x.edu").await;
    let snapshot = h.controller.settled().await;

    assert!(snapshot.profile.is_none());
    assert!(snapshot.profile_fetch_failed);
    // Still offered the form, as with a genuinely missing profile
    assert!(snapshot.needs_profile_creation);
}

#[tokio::test]
async fn test_login_with_unreadable_profile_warns_without_navigation() {
    let h = Harness::start().await;
    h.register_with_profile("ok@x.edu", approved_student()).await;
    // Enough for both the login read and the listener read
    h.store.fail_next_gets(6);

    let outcome = h
        .controller
        .login("ok@x.edu", &secret(PASSWORD), Role::Student)
        .await
        .expect("login");

    assert_eq!(outcome.navigation, None);
    assert_eq!(outcome.notice.level, NoticeLevel::Warning);
    assert!(outcome.snapshot.profile_fetch_failed);

    let snapshot = h.controller.settled().await;
    assert!(snapshot.profile_fetch_failed);
}

#[tokio::test]
async fn test_next_login_recovers_after_outage() {
    let h = Harness::start().await;
    h.register_with_profile("ok@x.edu", approved_student()).await;
    h.store.fail_next_gets(6);

    h.controller
        .login("ok@x.edu", &secret(PASSWORD), Role::Student)
        .await
        .expect("login");
    h.controller.settled().await;
    h.controller.logout().await;

    let outcome = h
        .controller
        .login("ok@x.edu", &secret(PASSWORD), Role::Student)
        .await
        .expect("login after outage");

    assert_eq!(outcome.navigation, Some(Navigation::StudentDashboard));
    assert!(!outcome.snapshot.profile_fetch_failed);
}
