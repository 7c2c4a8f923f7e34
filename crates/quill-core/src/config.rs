//! Quill Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for development. The resulting value is built once at
//! startup and handed to the components that need it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Development fallback for `JWT_SECRET`
pub const DEFAULT_JWT_SECRET: &str = "development-secret-key-change-in-production";

/// One week
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token signing and password hashing
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Overlay environment variables on this configuration (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.apply_env()
    }

    fn apply_env(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = parse_var("API_PORT", &port)?;
        }
        if let Ok(url) = std::env::var("CLIENT_URL") {
            self.server.client_url = url;
        }

        // Database
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url).filter(|u| !u.is_empty());
        }
        if let Ok(size) = std::env::var("DATABASE_POOL_SIZE") {
            self.database.pool_size = parse_var("DATABASE_POOL_SIZE", &size)?;
        }

        // Auth
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(ttl) = std::env::var("JWT_EXPIRES_IN") {
            self.auth.token_ttl_secs =
                parse_duration_secs(&ttl).ok_or_else(|| ConfigError::InvalidValue {
                    key: "JWT_EXPIRES_IN".to_string(),
                    value: ttl.clone(),
                })?;
        }
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            self.auth.jwt_issuer = issuer;
        }
        if let Ok(memory) = std::env::var("HASH_MEMORY_KIB") {
            self.auth.hash_memory_kib = parse_var("HASH_MEMORY_KIB", &memory)?;
        }
        if let Ok(time) = std::env::var("HASH_TIME_COST") {
            self.auth.hash_time_cost = parse_var("HASH_TIME_COST", &time)?;
        }
        if let Ok(lanes) = std::env::var("HASH_PARALLELISM") {
            self.auth.hash_parallelism = parse_var("HASH_PARALLELISM", &lanes)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a duration such as `7d`, `12h`, `30m`, `45s` or plain seconds
pub fn parse_duration_secs(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (digits, multiplier) = match value.char_indices().last() {
        Some((idx, 'd')) => (&value[..idx], 24 * 60 * 60),
        Some((idx, 'h')) => (&value[..idx], 60 * 60),
        Some((idx, 'm')) => (&value[..idx], 60),
        Some((idx, 's')) => (&value[..idx], 1),
        _ => (value, 1),
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .filter(|secs| *secs > 0)
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Browser origin allowed by CORS
    pub client_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            client_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Database connection configuration
///
/// With no URL the server runs on the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: Option<String>,

    /// Connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 10,
        }
    }
}

/// Token and credential settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub token_ttl_secs: u64,

    /// `iss` claim written to and required on every token
    pub jwt_issuer: String,

    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,

    /// Argon2 iterations
    pub hash_time_cost: u32,

    /// Argon2 lanes
    pub hash_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            jwt_issuer: "quill".to_string(),
            hash_memory_kib: 19 * 1024,
            hash_time_cost: 2,
            hash_parallelism: 1,
        }
    }
}

impl AuthConfig {
    /// True while the built-in development secret is in use
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "quill_api=debug,tower_http=debug".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_ttl_secs, 604_800);
        assert!(config.auth.uses_default_secret());
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs("7d"), Some(604_800));
        assert_eq!(parse_duration_secs("12h"), Some(43_200));
        assert_eq!(parse_duration_secs("30m"), Some(1_800));
        assert_eq!(parse_duration_secs("45s"), Some(45));
        assert_eq!(parse_duration_secs("3600"), Some(3_600));
        assert_eq!(parse_duration_secs(""), None);
        assert_eq!(parse_duration_secs("0"), None);
        assert_eq!(parse_duration_secs("soon"), None);
        assert_eq!(parse_duration_secs("1w"), None);
    }

    #[test]
    fn test_toml_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8081

            [auth]
            jwt_secret = "from-file"
            token_ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.token_ttl_secs, 60);
        assert_eq!(config.auth.jwt_issuer, "quill");
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_file("/nonexistent/quill.toml");
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }
}
