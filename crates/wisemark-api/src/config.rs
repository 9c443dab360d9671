//! Server configuration read from the environment.
//!
//! Environment variables:
//!   DATABASE_URL            - PostgreSQL connection string
//!   HOST / PORT             - bind address (default 0.0.0.0:3000)
//!   ALLOWED_ORIGINS         - comma-separated CORS allow-list
//!   RATE_LIMIT_ENABLED      - "true"/"false" (default true)
//!   RATE_LIMIT_REQUESTS     - requests per period (default 100)
//!   RATE_LIMIT_PERIOD_SECS  - period length (default 60)
//!   MAX_UPLOAD_BYTES        - request body limit for PDF uploads (default 50 MiB)
//!   PDF_STORAGE             - "postgres" or "s3" (default postgres)
//!   S3_BUCKET               - bucket name when PDF_STORAGE=s3
//!   LOG_FORMAT / LOG_FILE / LOG_ANSI - see [`crate::logging`]

use axum::http::HeaderValue;
use tracing::warn;

use wisemark_core::defaults::{
    MAX_UPLOAD_BYTES, RATE_LIMIT_PERIOD_SECS, RATE_LIMIT_REQUESTS, SERVER_PORT,
};
use wisemark_core::{Error, Result, StorageLocation};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/wisemark";
const DEFAULT_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Global rate limit settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u64,
    pub period_secs: u64,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// "json" or "text".
    pub format: String,
    pub file: Option<String>,
    /// `None` keeps auto-detection.
    pub ansi: Option<bool>,
}

impl LogConfig {
    /// Read only the `LOG_*` variables, so the subscriber can be installed
    /// before the rest of the configuration is parsed and warned about.
    pub fn from_env() -> Self {
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            format: lookup("LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            file: lookup("LOG_FILE").filter(|f| !f.trim().is_empty()),
            ansi: lookup("LOG_ANSI").map(|v| parse_flag(&v)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<HeaderValue>,
    pub rate_limit: RateLimitConfig,
    pub max_upload_bytes: usize,
    pub pdf_storage: StorageLocation,
    pub s3_bucket: Option<String>,
    pub log: LogConfig,
}

impl ApiConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pdf_storage = match lookup("PDF_STORAGE") {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<StorageLocation>()
                .map_err(|_| Error::Config(format!("PDF_STORAGE must be postgres or s3, got '{}'", raw)))?,
            _ => StorageLocation::Postgres,
        };

        let rate_limit = RateLimitConfig {
            enabled: lookup("RATE_LIMIT_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            requests: parse_or(&lookup, "RATE_LIMIT_REQUESTS", RATE_LIMIT_REQUESTS),
            period_secs: parse_or(&lookup, "RATE_LIMIT_PERIOD_SECS", RATE_LIMIT_PERIOD_SECS),
        };
        if rate_limit.enabled && (rate_limit.requests == 0 || rate_limit.period_secs == 0) {
            return Err(Error::Config(
                "RATE_LIMIT_REQUESTS and RATE_LIMIT_PERIOD_SECS must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", SERVER_PORT),
            allowed_origins: parse_allowed_origins(
                &lookup("ALLOWED_ORIGINS").unwrap_or_default(),
            ),
            rate_limit,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", MAX_UPLOAD_BYTES),
            pdf_storage,
            s3_bucket: lookup("S3_BUCKET").filter(|b| !b.trim().is_empty()),
            log: LogConfig::from_lookup(&lookup),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "Ignoring unparseable setting, using default");
            default
        }),
        None => default,
    }
}

/// Parse a comma-separated CORS origin list. Empty input yields the
/// development defaults; invalid entries are skipped with a warning.
pub fn parse_allowed_origins(origins: &str) -> Vec<HeaderValue> {
    let origins = if origins.trim().is_empty() {
        DEFAULT_ORIGINS
    } else {
        origins
    };

    origins
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}
