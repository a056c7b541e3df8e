//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Header carrying the client session token.
pub const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// The one address that is auto-provisioned as an approved administrator
/// on first sign-in. Never generalised to other addresses.
pub const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@vignanits.ac.in";

/// Check whether an email is the bootstrap administrator address.
pub fn is_bootstrap_admin(email: &str) -> bool {
    email.trim().eq_ignore_ascii_case(BOOTSTRAP_ADMIN_EMAIL)
}

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_ALLOWED_ORIGIN: &str = "http://localhost:3000";
    pub const SESSION_IDLE_SECS: u64 = 1800;
    pub const SWEEP_INTERVAL_SECS: u64 = 60;
    pub const FETCH_RETRIES: u32 = 2;
    pub const FETCH_BACKOFF_MS: u64 = 250;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Tuning for the reconciliation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Extra attempts made when a profile read fails before the identity
    /// is treated as profile-absent for that cycle.
    pub fetch_retries: u32,
    /// Linear backoff step between profile read attempts.
    pub fetch_backoff: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            fetch_retries: defaults::FETCH_RETRIES,
            fetch_backoff: Duration::from_millis(defaults::FETCH_BACKOFF_MS),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Profile database URL. `None` selects the in-memory profile store
    /// (development only).
    pub database_url: Option<String>,
    /// Origin allowed by CORS
    pub allowed_origin: String,
    /// Idle time after which a client session is evicted
    pub session_idle_secs: u64,
    /// How often the idle-session sweep runs
    pub sweep_interval_secs: u64,
    /// Controller tuning
    pub session: SessionSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `PORTAL_HOST`: Server host (default: 127.0.0.1)
    /// - `PORTAL_PORT`: Server port (default: 8080)
    /// - `DATABASE_URL`: Profile database (required in production)
    /// - `PORTAL_ALLOWED_ORIGIN`: CORS origin (default: http://localhost:3000)
    /// - `PORTAL_SESSION_IDLE_SECS`: Client session idle timeout (default: 1800)
    /// - `PORTAL_SWEEP_INTERVAL_SECS`: Idle sweep interval (default: 60)
    /// - `PORTAL_FETCH_RETRIES`: Profile read retries (default: 2)
    /// - `PORTAL_FETCH_BACKOFF_MS`: Profile read backoff step (default: 250)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("PORTAL_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = parse_var("PORTAL_PORT", defaults::DEV_PORT)
            .map_err(|_| ConfigError::InvalidValue("PORTAL_PORT must be a valid port number"))?;

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let allowed_origin = env::var("PORTAL_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| defaults::DEV_ALLOWED_ORIGIN.to_string());

        let session_idle_secs = parse_var("PORTAL_SESSION_IDLE_SECS", defaults::SESSION_IDLE_SECS)
            .map_err(|_| {
                ConfigError::InvalidValue("PORTAL_SESSION_IDLE_SECS must be a valid number")
            })?;

        let sweep_interval_secs =
            parse_var("PORTAL_SWEEP_INTERVAL_SECS", defaults::SWEEP_INTERVAL_SECS).map_err(
                |_| ConfigError::InvalidValue("PORTAL_SWEEP_INTERVAL_SECS must be a valid number"),
            )?;

        let fetch_retries = parse_var("PORTAL_FETCH_RETRIES", defaults::FETCH_RETRIES)
            .map_err(|_| ConfigError::InvalidValue("PORTAL_FETCH_RETRIES must be a valid number"))?;

        let fetch_backoff_ms = parse_var("PORTAL_FETCH_BACKOFF_MS", defaults::FETCH_BACKOFF_MS)
            .map_err(|_| {
                ConfigError::InvalidValue("PORTAL_FETCH_BACKOFF_MS must be a valid number")
            })?;

        let config = Config {
            environment,
            host,
            port,
            database_url,
            allowed_origin,
            session_idle_secs,
            sweep_interval_secs,
            session: SessionSettings {
                fetch_retries,
                fetch_backoff: Duration::from_millis(fetch_backoff_ms),
            },
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not rely on development fallbacks.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database_url.is_none() {
            errors.push(
                "DATABASE_URL is not set. The in-memory profile store is for development only."
                    .to_string(),
            );
        }

        if self.allowed_origin == defaults::DEV_ALLOWED_ORIGIN {
            errors.push(format!(
                "PORTAL_ALLOWED_ORIGIN is using development default '{}'. Set the portal's public origin.",
                defaults::DEV_ALLOWED_ORIGIN
            ));
        }

        if self.session_idle_secs == 0 {
            errors.push("PORTAL_SESSION_IDLE_SECS must be greater than zero.".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, T::Err> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>(),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
