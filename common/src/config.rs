//! Process configuration.
//!
//! Values are read once at startup from the process environment, falling
//! back to a `.env` file in the working directory. The `.env` file is parsed
//! without touching the environment, so the credential never leaks into
//! child processes or other code reading `std::env`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use axum::http::HeaderValue;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_SAMPLE_ROWS: usize = 3;

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Language-model settings.
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
}

// The API key must never end up in logs.
impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// Maximum number of tool invocations before the agent gives up.
    pub max_iterations: usize,
    /// Row limit the agent is told to apply to its queries.
    pub top_k: usize,
    /// Sample rows included per table when describing the schema.
    pub sample_rows: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            top_k: DEFAULT_TOP_K,
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }
}

/// Application configuration, immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin, without trailing slash.
    pub frontend_url: String,
    pub frontend_origin: HeaderValue,
    pub llm: LlmSettings,
    pub agent: AgentSettings,
}

impl AppConfig {
    /// Loads configuration for the named service from the environment and
    /// an optional `.env` file.
    pub fn load_with_service(service_name: &str) -> Result<Self, ConfigError> {
        let dotenv = read_dotenv();
        Self::from_lookup(service_name, |key| {
            std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
        })
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;

        let frontend_url = get("FRONTEND_URL")
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let frontend_origin =
            HeaderValue::from_str(&frontend_url).map_err(|e| ConfigError::Invalid {
                key: "FRONTEND_URL",
                reason: e.to_string(),
            })?;

        let temperature = parse_or("LLM_TEMPERATURE", get("LLM_TEMPERATURE"), DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "LLM_TEMPERATURE",
                reason: format!("{} is outside 0.0..=2.0", temperature),
            });
        }

        let agent = AgentSettings {
            max_iterations: at_least_one(
                "AGENT_MAX_ITERATIONS",
                parse_or("AGENT_MAX_ITERATIONS", get("AGENT_MAX_ITERATIONS"), DEFAULT_MAX_ITERATIONS)?,
            )?,
            top_k: at_least_one("AGENT_TOP_K", parse_or("AGENT_TOP_K", get("AGENT_TOP_K"), DEFAULT_TOP_K)?)?,
            sample_rows: parse_or("AGENT_SAMPLE_ROWS", get("AGENT_SAMPLE_ROWS"), DEFAULT_SAMPLE_ROWS)?,
        };

        Ok(Self {
            service_name: service_name.to_string(),
            host: get("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("SERVER_PORT", get("SERVER_PORT"), DEFAULT_PORT)?,
            frontend_url,
            frontend_origin,
            llm: LlmSettings {
                api_key,
                model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature,
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            agent,
        })
    }

    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn at_least_one(key: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

/// Reads `.env` into a map. A missing or unreadable file yields an empty map.
fn read_dotenv() -> HashMap<String, String> {
    match dotenvy::dotenv_iter() {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(_) => HashMap::new(),
    }
}
