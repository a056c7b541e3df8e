//! Department portal session server library.
//!
//! Provides the identity/profile reconciliation controller, the identity
//! and profile store adapters, and the HTTP surface that drives one
//! controller per client session.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
pub mod session;
pub mod store;
