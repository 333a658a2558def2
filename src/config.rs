//! Service configuration parsed from environment variables.
//!
//! Every service shares one config; values are read once at startup after
//! `dotenvy` has loaded any local `.env` file.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DIRECTORY_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DIRECTORY_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Timeouts applied to every outbound directory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Counter store; `None` keeps live room counts in process memory.
    pub redis_url: Option<String>,
    /// Base URL of the user service answering directory lookups.
    pub user_service_url: String,
    /// Base URL of the school service answering class lookups.
    pub school_service_url: String,
    pub directory_timeouts: DirectoryTimeouts,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `REDIS_URL`: in-memory counters when absent
    /// - `USER_SERVICE_URL` / `SCHOOL_SERVICE_URL`: default this process
    ///   (`http://127.0.0.1:<PORT>`)
    /// - `DIRECTORY_REQUEST_TIMEOUT_SECS`: default 10
    /// - `DIRECTORY_CONNECT_TIMEOUT_SECS`: default 3
    /// - `SESSION_TTL_HOURS`: default 168
    /// - `COOKIE_SECURE`: default false
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url,
            port,
            redis_url,
            user_service_url: service_url("USER_SERVICE_URL", port),
            school_service_url: service_url("SCHOOL_SERVICE_URL", port),
            directory_timeouts: DirectoryTimeouts {
                request_secs: env_parse("DIRECTORY_REQUEST_TIMEOUT_SECS", DEFAULT_DIRECTORY_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("DIRECTORY_CONNECT_TIMEOUT_SECS", DEFAULT_DIRECTORY_CONNECT_TIMEOUT_SECS),
            },
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
        })
    }
}

/// Base URL of this process, used when a service runs co-located.
#[must_use]
pub fn local_service_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

fn service_url(key: &str, port: u16) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| local_service_url(port))
        .trim_end_matches('/')
        .to_string()
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
