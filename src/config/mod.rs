//! Configuration module for the Blawg backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// An environment variable held a value that could not be parsed.
#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.var, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Page size used by the blog listing when no limit is requested
    pub default_list_limit: usize,
    /// Upper bound on the blog listing page size
    pub max_list_limit: usize,
    /// Compare-and-swap attempts before a reaction reports a conflict
    pub reaction_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_psk: None,
            db_path: PathBuf::from("./data/blawg.sqlite"),
            index_path: PathBuf::from("./data/index"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            default_list_limit: 50,
            max_list_limit: 200,
            reaction_attempts: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Self {
            api_psk: env::var("BLAWG_API_PSK").ok().filter(|k| !k.is_empty()),
            db_path: env::var("BLAWG_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            index_path: env::var("BLAWG_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            bind_addr: parse_var("BLAWG_BIND_ADDR", defaults.bind_addr)?,
            log_level: env::var("BLAWG_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_var("BLAWG_LOG_FORMAT", defaults.log_format)?,
            default_list_limit: parse_var("BLAWG_LIST_LIMIT", defaults.default_list_limit)?,
            max_list_limit: parse_var("BLAWG_MAX_LIST_LIMIT", defaults.max_list_limit)?,
            reaction_attempts: parse_var("BLAWG_REACTION_ATTEMPTS", defaults.reaction_attempts)?,
        };

        if config.default_list_limit == 0 || config.default_list_limit > config.max_list_limit {
            return Err(ConfigError {
                var: "BLAWG_LIST_LIMIT",
                message: format!("must be between 1 and {}", config.max_list_limit),
            });
        }
        if config.reaction_attempts == 0 {
            return Err(ConfigError {
                var: "BLAWG_REACTION_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(config)
    }
}

fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const VARS: [&str; 9] = [
        "BLAWG_API_PSK",
        "BLAWG_DB_PATH",
        "BLAWG_INDEX_PATH",
        "BLAWG_BIND_ADDR",
        "BLAWG_LOG_LEVEL",
        "BLAWG_LOG_FORMAT",
        "BLAWG_LIST_LIMIT",
        "BLAWG_MAX_LIST_LIMIT",
        "BLAWG_REACTION_ATTEMPTS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/blawg.sqlite"));
        assert_eq!(config.index_path, PathBuf::from("./data/index"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.default_list_limit, 50);
        assert_eq!(config.reaction_attempts, 3);
    }

    #[test]
    fn test_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("BLAWG_BIND_ADDR", "0.0.0.0:9000");
        env::set_var("BLAWG_LOG_FORMAT", "JSON");
        env::set_var("BLAWG_LIST_LIMIT", "10");
        env::set_var("BLAWG_REACTION_ATTEMPTS", "5");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_list_limit, 10);
        assert_eq!(config.reaction_attempts, 5);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("BLAWG_BIND_ADDR", "not-an-address");
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.var, "BLAWG_BIND_ADDR");

        clear_env();
        env::set_var("BLAWG_LIST_LIMIT", "0");
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.var, "BLAWG_LIST_LIMIT");

        clear_env();
        env::set_var("BLAWG_REACTION_ATTEMPTS", "0");
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.var, "BLAWG_REACTION_ATTEMPTS");
        clear_env();
    }
}
