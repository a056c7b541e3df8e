//! Department portal session server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpServer, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dept_portal_lib::api;
use dept_portal_lib::config::Config;
use dept_portal_lib::db::DbPool;
use dept_portal_lib::identity::AccountDirectory;
use dept_portal_lib::middleware::RequestLogger;
use dept_portal_lib::services::{SessionRegistry, SweeperConfig, start_session_sweeper};
use dept_portal_lib::store::{
    AccountStore, DatabaseAccountStore, DatabaseProfileStore, InMemoryAccountStore,
    InMemoryProfileStore, ProfileStore,
};

/// Account and profile stores named by the configuration.
struct Stores {
    accounts: Arc<dyn AccountStore>,
    profiles: Arc<dyn ProfileStore>,
}

/// Connect the stores named by the configuration.
async fn build_stores(config: &Config) -> Result<Stores, String> {
    match &config.database_url {
        Some(url) => {
            let pool = DbPool::connect(url)
                .await
                .map_err(|e| format!("Failed to connect to database: {e}"))?;
            info!("Database connection established");

            pool.run_migrations()
                .await
                .map_err(|e| format!("Failed to run migrations: {e}"))?;

            Ok(Stores {
                accounts: Arc::new(DatabaseAccountStore::new(pool.clone())),
                profiles: Arc::new(DatabaseProfileStore::new(pool)),
            })
        }
        None => {
            warn!("DATABASE_URL not set, accounts and profiles are kept in memory and lost on restart");
            Ok(Stores {
                accounts: Arc::new(InMemoryAccountStore::new()),
                profiles: Arc::new(InMemoryProfileStore::new()),
            })
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and PORTAL_ALLOWED_ORIGIN must be set");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Department Portal Session Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let stores = match build_stores(&config).await {
        Ok(stores) => stores,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let registry = Arc::new(SessionRegistry::new(
        Arc::new(AccountDirectory::with_store(stores.accounts)),
        stores.profiles,
        config.session,
        Duration::from_secs(config.session_idle_secs),
    ));

    let sweeper = start_session_sweeper(
        Arc::clone(&registry),
        SweeperConfig {
            interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        },
    );
    info!(
        idle_secs = config.session_idle_secs,
        "Session sweeper started"
    );

    let bind_address = config.bind_address();
    let allowed_origin = config.allowed_origin.clone();
    let registry_data = web::Data::from(Arc::clone(&registry));

    let worker_count = if config.is_development() {
        4
    } else {
        num_cpus::get()
    };
    info!(
        "Starting server at http://{} ({} workers)",
        bind_address, worker_count
    );

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                HeaderName::from_static("x-session-token"),
            ])
            .max_age(3600);

        App::new()
            // Add CORS middleware (must be before other middleware)
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(registry_data.clone())
            .service(web::scope("/api/v1").configure(api::configure))
    });

    let result = server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await;

    sweeper.abort();
    registry.close_all();
    info!("Server stopped");

    result
}
