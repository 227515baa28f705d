// src/config.rs

use std::{env, fmt, net::SocketAddr, path::PathBuf};

use url::Url;

/// Minimum number of questions accepted by a single save request.
pub const MIN_SAVE_BATCH: usize = 5;

/// Upper bound on a single save request.
pub const MAX_SAVE_BATCH: usize = 50;

/// Maximum number of question/answer pairs held by one quiz session.
pub const MAX_SESSION_QUESTIONS: usize = 7;

/// Every multiple-choice question carries exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// Questions generated per request when the caller does not ask for a count.
pub const DEFAULT_GENERATE_COUNT: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    /// Remaining lifetime (seconds) below which a token is re-issued.
    pub jwt_renew_threshold: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bind_addr: SocketAddr,
    /// Base of every QR payload string, always ending with '/'.
    pub public_base_url: Url,
    pub file_root: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, reason) => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(key, e.to_string())),
        None => Ok(default),
    }
}

/// Parses the public base URL, forcing a trailing slash so `Url::join` appends
/// instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| ConfigError::Invalid("PUBLIC_BASE_URL", e.to_string()))
}

impl Config {
    /// Reads the process environment. `main` loads `.env` beforehand.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed("JWT_EXPIRATION", 7 * 24 * 60 * 60)?;
        let jwt_renew_threshold = parsed("JWT_RENEW_THRESHOLD", 24 * 60 * 60)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let public_base_url = parse_base_url(
            &optional("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:3000/".to_string()),
        )?;

        let cors_origins = optional("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            jwt_renew_threshold,
            rust_log,
            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),
            bind_addr,
            public_base_url,
            file_root: PathBuf::from(optional("FILE_ROOT").unwrap_or_else(|| "uploads".to_string())),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            gemini_base_url: optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            cors_origins,
        })
    }
}
