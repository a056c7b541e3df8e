//! HTTP API test suite.
//!
//! Exercises the session, account and profile routes in-process, against
//! the in-memory stores and, for restarts, SQLite.
//!
//! Run with: cargo test --test api

mod test_helpers;

mod test_accounts;
mod test_admin_approval;
