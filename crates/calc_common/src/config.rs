//! Configuration for calcd.
//!
//! Read once from the process environment at startup; there is no reload.
//! The daemon loads a `.env` file into the environment before calling
//! [`CalcConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Gemini REST root
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default multimodal model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default request body limit: 25 MiB
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Deployment flavour, from `ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Environment::Prod,
            _ => Environment::Dev,
        }
    }

    /// Log filter used when RUST_LOG is unset
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Environment::Dev => "debug,hyper=info,reqwest=info",
            Environment::Prod => "info",
        }
    }
}

/// Gemini backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; requests fail with an error envelope when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalcConfig {
    /// Bind host (`SERVER_URL`)
    pub server_url: String,
    pub port: u16,
    pub env: Environment,
    pub max_body_bytes: usize,
    pub gemini: GeminiConfig,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            server_url: "localhost".to_string(),
            port: 8900,
            env: Environment::Dev,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            gemini: GeminiConfig::default(),
        }
    }
}

impl CalcConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            model: get("GEMINI_MODEL")
                .map(|m| m.trim_start_matches("models/").to_string())
                .unwrap_or(defaults.gemini.model),
            api_base: get("GEMINI_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini.api_base),
            timeout_secs: get("GEMINI_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.gemini.timeout_secs),
        };

        Self {
            server_url: get("SERVER_URL").unwrap_or(defaults.server_url),
            port: get("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            env: get("ENV")
                .map(|e| Environment::parse(&e))
                .unwrap_or(defaults.env),
            max_body_bytes: get("MAX_BODY_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            gemini,
        }
    }

    /// `host:port` string handed to the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_url, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = CalcConfig::from_lookup(lookup(&[]));
        assert_eq!(config.server_url, "localhost");
        assert_eq!(config.port, 8900);
        assert_eq!(config.env, Environment::Dev);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.gemini.timeout_secs, 60);
    }

    #[test]
    fn test_reads_overrides() {
        let config = CalcConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "  secret  "),
            ("GEMINI_MODEL", "models/gemini-2.5-flash"),
            ("GEMINI_API_BASE", "http://127.0.0.1:9999/v1beta/"),
            ("SERVER_URL", "0.0.0.0"),
            ("PORT", "8000"),
            ("ENV", "prod"),
        ]));
        assert_eq!(config.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.api_base, "http://127.0.0.1:9999/v1beta");
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.env, Environment::Prod);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = CalcConfig::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("GEMINI_TIMEOUT_SECS", "-3"),
            ("GEMINI_API_KEY", "   "),
        ]));
        assert_eq!(config.port, 8900);
        assert_eq!(config.gemini.timeout_secs, 60);
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("PROD"), Environment::Prod);
        assert_eq!(Environment::parse("production"), Environment::Prod);
        assert_eq!(Environment::parse("dev"), Environment::Dev);
        assert_eq!(Environment::parse("staging"), Environment::Dev);
    }
}
