//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Signing secret used when `BOOKSTORE_JWT_SECRET` is unset. Development only.
pub const DEV_JWT_SECRET: &str = "bookstore-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Upper bound of the connection pool
    pub db_max_connections: u32,

    /// HS256 signing secret for session tokens
    pub jwt_secret: String,

    /// Session (and token) lifetime in seconds
    pub session_lifetime_secs: i64,

    /// Create the first supervisor when no account exists
    pub bootstrap_admin: bool,

    pub admin_username: String,
    pub admin_password: String,
    pub admin_employee_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8000,
            database_path: PathBuf::from("./bookstore.db"),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_lifetime_secs: 8 * 60 * 60,
            bootstrap_admin: true,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            admin_employee_id: "0001".to_string(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            http_port: parse_or(&lookup, "BOOKSTORE_HTTP_PORT", defaults.http_port)?,

            database_path: lookup("BOOKSTORE_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            db_max_connections: parse_or(
                &lookup,
                "BOOKSTORE_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,

            jwt_secret: lookup("BOOKSTORE_JWT_SECRET").unwrap_or(defaults.jwt_secret),

            session_lifetime_secs: parse_or(
                &lookup,
                "BOOKSTORE_SESSION_LIFETIME_SECS",
                defaults.session_lifetime_secs,
            )?,

            bootstrap_admin: parse_or(&lookup, "BOOKSTORE_BOOTSTRAP_ADMIN", defaults.bootstrap_admin)?,

            admin_username: lookup("BOOKSTORE_ADMIN_USERNAME").unwrap_or(defaults.admin_username),
            admin_password: lookup("BOOKSTORE_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            admin_employee_id: lookup("BOOKSTORE_ADMIN_EMPLOYEE_ID")
                .unwrap_or(defaults.admin_employee_id),
        };

        if config.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("BOOKSTORE_JWT_SECRET".to_string()));
        }
        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("BOOKSTORE_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.session_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "BOOKSTORE_SESSION_LIFETIME_SECS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Whether tokens are signed with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_port, 8000);
        assert_eq!(config.database_path, PathBuf::from("./bookstore.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.session_lifetime_secs, 28800);
        assert!(config.bootstrap_admin);
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.admin_employee_id, "0001");
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("BOOKSTORE_HTTP_PORT", "9090"),
            ("BOOKSTORE_JWT_SECRET", "s3cret"),
            ("BOOKSTORE_BOOTSTRAP_ADMIN", "false"),
            ("BOOKSTORE_DATABASE_PATH", "/tmp/shop.db"),
        ]))
        .unwrap();

        assert_eq!(config.http_port, 9090);
        assert!(!config.bootstrap_admin);
        assert!(!config.uses_dev_secret());
        assert_eq!(config.database_path, PathBuf::from("/tmp/shop.db"));
    }

    #[test]
    fn test_invalid_values() {
        let err = ApiConfig::from_lookup(lookup(&[("BOOKSTORE_HTTP_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("BOOKSTORE_HTTP_PORT"));

        assert!(ApiConfig::from_lookup(lookup(&[("BOOKSTORE_DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("BOOKSTORE_JWT_SECRET", "")])).is_err());
        assert!(
            ApiConfig::from_lookup(lookup(&[("BOOKSTORE_SESSION_LIFETIME_SECS", "-5")])).is_err()
        );
    }
}
