//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const OPENAI_BASE: &str = "https://api.openai.com/v1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where conversations are persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// A local SQLite file.
    Local { path: PathBuf },
    /// A remote libSQL endpoint reached over HTTPS.
    Remote { url: String, auth_token: Option<String> },
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub database: DatabaseTarget,
    pub llm_api_key: String,
    pub llm_api_base: String,
    pub agent_model: String,
    pub agent_max_iterations: usize,
    pub rapidapi_key: String,
    pub domainr_base_url: String,
    pub cors_allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_allowed_origin = std::env::var("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Database Settings ---
        let database = match non_empty_var("TURSO_DATABASE_URL") {
            Some(url) => DatabaseTarget::Remote {
                url: remote_http_url(&url),
                auth_token: non_empty_var("TURSO_AUTH_TOKEN"),
            },
            None => DatabaseTarget::Local {
                path: std::env::var("LOCAL_DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("local.db")),
            },
        };

        // --- Load LLM Settings ---
        let gemini_api_key = non_empty_var("GEMINI_API_KEY");
        let openai_api_key = non_empty_var("OPENAI_API_KEY");
        let (llm_api_key, default_base, default_model) = match (gemini_api_key, openai_api_key) {
            (Some(key), _) => (key, GEMINI_OPENAI_BASE, "gemini-2.5-pro"),
            (None, Some(key)) => (key, OPENAI_BASE, "gpt-4o"),
            (None, None) => {
                return Err(ConfigError::MissingVar(
                    "GEMINI_API_KEY or OPENAI_API_KEY".to_string(),
                ))
            }
        };
        let llm_api_base = non_empty_var("LLM_API_BASE")
            .unwrap_or_else(|| default_base.to_string())
            .trim_end_matches('/')
            .to_string();
        let agent_model =
            non_empty_var("AGENT_MODEL").unwrap_or_else(|| default_model.to_string());

        let agent_max_iterations = match non_empty_var("AGENT_MAX_ITERATIONS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "AGENT_MAX_ITERATIONS".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    ))
                }
            },
            None => 10,
        };

        // --- Load Domain Lookup Settings ---
        let rapidapi_key = non_empty_var("RAPIDAPI_KEY")
            .ok_or_else(|| ConfigError::MissingVar("RAPIDAPI_KEY".to_string()))?;
        let domainr_base_url = non_empty_var("DOMAINR_BASE_URL")
            .unwrap_or_else(|| "https://domainr.p.rapidapi.com".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bind_address,
            log_level,
            database,
            llm_api_key,
            llm_api_base,
            agent_model,
            agent_max_iterations,
            rapidapi_key,
            domainr_base_url,
            cors_allowed_origin,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// libSQL URLs are served over HTTPS by the pipeline endpoint.
fn remote_http_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    match url.strip_prefix("libsql://") {
        Some(host) => format!("https://{}", host),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "BIND_ADDRESS",
        "RUST_LOG",
        "CORS_ALLOWED_ORIGIN",
        "TURSO_DATABASE_URL",
        "TURSO_AUTH_TOKEN",
        "LOCAL_DATABASE_PATH",
        "GEMINI_API_KEY",
        "OPENAI_API_KEY",
        "LLM_API_BASE",
        "AGENT_MODEL",
        "AGENT_MAX_ITERATIONS",
        "RAPIDAPI_KEY",
        "DOMAINR_BASE_URL",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    /// Clears everything, then sets only the keys startup cannot do without.
    fn required_env() {
        clear_env();
        std::env::set_var("GEMINI_API_KEY", "gemini-test");
        std::env::set_var("RAPIDAPI_KEY", "rapid-test");
    }

    #[test]
    #[serial]
    fn defaults_use_local_store_and_gemini() {
        required_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(
            config.database,
            DatabaseTarget::Local { path: PathBuf::from("local.db") }
        );
        assert_eq!(config.llm_api_base, GEMINI_OPENAI_BASE);
        assert_eq!(config.agent_model, "gemini-2.5-pro");
        assert_eq!(config.agent_max_iterations, 10);
        assert_eq!(config.llm_api_key, "gemini-test");
        assert_eq!(config.rapidapi_key, "rapid-test");
        assert_eq!(config.domainr_base_url, "https://domainr.p.rapidapi.com");
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_llm_key_is_rejected() {
        clear_env();
        std::env::set_var("RAPIDAPI_KEY", "rapid-test");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar(name)) if name == "GEMINI_API_KEY or OPENAI_API_KEY"
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_rapidapi_key_is_rejected() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar(name)) if name == "RAPIDAPI_KEY"
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn remote_database_url_is_rewritten_to_https() {
        required_env();
        std::env::set_var("TURSO_DATABASE_URL", "libsql://ideas-acme.turso.io");
        std::env::set_var("TURSO_AUTH_TOKEN", "secret");

        let config = Config::from_env().unwrap();

        assert_eq!(
            config.database,
            DatabaseTarget::Remote {
                url: "https://ideas-acme.turso.io".to_string(),
                auth_token: Some("secret".to_string()),
            }
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn openai_key_switches_defaults() {
        required_env();
        std::env::remove_var("GEMINI_API_KEY");
        std::env::set_var("OPENAI_API_KEY", "sk-test");

        let config = Config::from_env().unwrap();

        assert_eq!(config.llm_api_key, "sk-test");
        assert_eq!(config.llm_api_base, OPENAI_BASE);
        assert_eq!(config.agent_model, "gpt-4o");
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_zero_iterations() {
        required_env();
        std::env::set_var("AGENT_MAX_ITERATIONS", "0");

        let err = Config::from_env().unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "AGENT_MAX_ITERATIONS"));
        clear_env();
    }

    #[test]
    #[serial]
    fn rejects_bad_bind_address() {
        required_env();
        std::env::set_var("BIND_ADDRESS", "not-an-address");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(name, _)) if name == "BIND_ADDRESS"
        ));
        clear_env();
    }
}
