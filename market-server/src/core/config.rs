//! Server configuration

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Scale of the stored rating columns (`NUMERIC(6, 4)`)
pub const MAX_RATING_PRECISION: u32 = 4;

/// Storage backend selected by `STORE_BACKEND`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process memory; for tests and local demos
    Memory,
}

/// Market server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL (unused by the memory backend)
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// HS256 secret shared with the identity service
    pub jwt_secret: String,
    /// Expected `iss` of bearer tokens
    pub jwt_issuer: String,
    pub db_max_connections: u32,
    pub request_timeout: Duration,
    /// Decimal places of mean stars and criteria
    pub rating_precision: u32,
    /// JSON log output
    pub log_json: bool,
    /// Directory for rotating log files
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables (after `.env`)
    pub fn from_env() -> Result<Self, BoxError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(format!("unknown STORE_BACKEND: {other}").into()),
        };

        let database_url = var("DATABASE_URL").filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set".into());
        }

        let rating_precision = parse_or(&var, "RATING_PRECISION", 2)?;
        if rating_precision > MAX_RATING_PRECISION {
            return Err(format!(
                "RATING_PRECISION must be between 0 and {MAX_RATING_PRECISION}, got {rating_precision}"
            )
            .into());
        }

        Ok(Self {
            database_url,
            store_backend,
            http_port: parse_or(&var, "HTTP_PORT", 8080)?,
            jwt_secret: require_secret(&var, "JWT_SECRET", &environment)?,
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| "market-identity".into()),
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 10)?,
            request_timeout: Duration::from_secs(parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?),
            rating_precision,
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            log_dir: var("LOG_DIR").filter(|s| !s.is_empty()),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, BoxError>
where
    T: std::str::FromStr,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{name} is not a valid value: {raw}").into()),
        None => Ok(default),
    }
}

/// Require a secret: must be set and non-empty outside development.
fn require_secret(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    environment: &str,
) -> Result<String, BoxError> {
    match var(name) {
        Some(val) if !val.is_empty() => Ok(val),
        _ if environment != "development" => {
            Err(format!("{name} must be set in {environment} environment").into())
        }
        _ => {
            tracing::warn!("{name} not set, using a development-only value");
            Ok(format!("dev-{name}-not-for-production"))
        }
    }
}
