//! API endpoint modules.

pub mod accounts;
pub mod health;
pub mod profiles;
pub mod session;

pub use accounts::configure_routes as configure_account_routes;
pub use health::configure_health_routes;
pub use profiles::configure_routes as configure_profile_routes;
pub use session::configure_routes as configure_session_routes;

use actix_web::web;

/// Mount every API route. Callers wrap this in the `/api/v1` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_session_routes)
        .configure(configure_account_routes)
        .configure(configure_profile_routes);
}
