//! Session controller test suite.
//!
//! Drives `SessionController` against the local identity provider and an
//! instrumented in-memory profile store. No database or HTTP involved.
//!
//! Run with: cargo test --test session_controller

mod test_helpers;

mod test_bootstrap_admin;
mod test_fetch_failures;
