//! Database module providing connection management, migrations, and queries.

pub mod accounts;
pub mod profiles;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::migration::Migrator;

/// Shared SeaORM connection pool.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect using the configured `DATABASE_URL`.
    pub async fn new(config: &Config) -> StoreResult<Self> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            StoreError::Unavailable("DATABASE_URL is not configured".to_string())
        })?;
        Self::connect(url).await
    }

    /// Connect to the given database URL.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let mut options = ConnectOptions::new(url.to_owned());
        // Every connection to an in-memory SQLite database sees its own database
        if url.starts_with("sqlite::memory:") {
            options.max_connections(1).min_connections(1);
        } else {
            options.max_connections(10).min_connections(1);
        }
        options
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options).await?;
        Ok(Self { conn })
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        Migrator::up(&self.conn, None).await?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }
}
