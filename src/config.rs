//! Service configuration loaded once from the environment at startup.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::models::{ChatDefaults, MAX_MAX_TOKENS, MAX_TEMPERATURE, MIN_MAX_TOKENS, MIN_TEMPERATURE};
use crate::sanitize::MAX_SANITIZED_CHARS;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("GROQ_API_KEY is required but not set")]
    MissingCredential,

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings.
///
/// Environment:
/// - GROQ_API_KEY                (required)
/// - GROQ_BASE_URL               default https://api.groq.com/openai/v1
/// - GROQ_DEFAULT_MODEL          default llama-3.1-8b-instant
/// - HOST / PORT                 default 0.0.0.0 / 8000
/// - DEBUG                       1|true|yes|on
/// - MAX_MESSAGE_LENGTH          default 4000
/// - DEFAULT_MAX_TOKENS          default 1024
/// - DEFAULT_TEMPERATURE         default 0.7
/// - ALLOWED_ORIGINS             "*" or comma-separated origins
/// - LOG_LEVEL                   default INFO
/// - PROVIDER_TIMEOUT_SECONDS    default 30
/// - SYSTEM_INSTRUCTIONS         optional text appended to the system prompt
#[derive(Clone)]
pub struct Settings {
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub default_model: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub max_message_length: usize,
    pub default_max_tokens: u32,
    pub default_temperature: f64,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub provider_timeout: Duration,
    pub system_instructions: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("groq_api_key", &"<redacted>")
            .field("groq_base_url", &self.groq_base_url)
            .field("default_model", &self.default_model)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("debug", &self.debug)
            .field("max_message_length", &self.max_message_length)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("default_temperature", &self.default_temperature)
            .field("allowed_origins", &self.allowed_origins)
            .field("log_level", &self.log_level)
            .field("provider_timeout", &self.provider_timeout)
            .field("system_instructions", &self.system_instructions)
            .finish()
    }
}

fn truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// An origin must be a bare `scheme://authority` URI.
fn check_origin(origin: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: "ALLOWED_ORIGINS",
        value: origin.to_string(),
        reason: reason.to_string(),
    };
    let uri: http::Uri = origin
        .parse()
        .map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(invalid("origin needs a scheme and host"));
    }
    if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
        return Err(invalid("origin must not carry a path or query"));
    }
    Ok(())
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let groq_api_key = lookup("GROQ_API_KEY")
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::MissingCredential)?;

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            groq_api_key,
            groq_base_url: lookup("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: lookup("GROQ_DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8000u16)?,
            debug: lookup("DEBUG").map(|v| truthy(&v)).unwrap_or(false),
            max_message_length: parse_or(&lookup, "MAX_MESSAGE_LENGTH", 4000usize)?,
            default_max_tokens: parse_or(&lookup, "DEFAULT_MAX_TOKENS", 1024u32)?,
            default_temperature: parse_or(&lookup, "DEFAULT_TEMPERATURE", 0.7f64)?,
            allowed_origins,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "INFO".to_string()),
            provider_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PROVIDER_TIMEOUT_SECONDS",
                30u64,
            )?),
            system_instructions: lookup("SYSTEM_INSTRUCTIONS"),
        })
    }

    /// Range checks that parsing alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.groq_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                key: "PORT",
                value: self.port.to_string(),
                reason: "must be between 1 and 65535".into(),
            });
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.default_temperature) {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_TEMPERATURE",
                value: self.default_temperature.to_string(),
                reason: "must be between 0.0 and 2.0".into(),
            });
        }
        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&i64::from(self.default_max_tokens)) {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_MAX_TOKENS",
                value: self.default_max_tokens.to_string(),
                reason: "must be between 1 and 4096".into(),
            });
        }
        if self.max_message_length == 0 || self.max_message_length > MAX_SANITIZED_CHARS {
            return Err(ConfigError::Invalid {
                key: "MAX_MESSAGE_LENGTH",
                value: self.max_message_length.to_string(),
                reason: format!("must be between 1 and {MAX_SANITIZED_CHARS}"),
            });
        }
        if !self.allows_any_origin() {
            for origin in &self.allowed_origins {
                check_origin(origin)?;
            }
        }
        if self.provider_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "PROVIDER_TIMEOUT_SECONDS",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Default tracing filter: `debug` when DEBUG is set, otherwise LOG_LEVEL
    /// mapped onto tracing's level names.
    pub fn log_filter(&self) -> String {
        if self.debug {
            return "debug".to_string();
        }
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "critical" | "error" => "error".to_string(),
            "warning" | "warn" => "warn".to_string(),
            "debug" => "debug".to_string(),
            "trace" => "trace".to_string(),
            _ => "info".to_string(),
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    pub fn chat_defaults(&self) -> ChatDefaults {
        ChatDefaults {
            model: self.default_model.clone(),
            max_tokens: self.default_max_tokens,
            temperature: self.default_temperature,
            max_message_chars: self.max_message_length.min(MAX_SANITIZED_CHARS),
        }
    }
}
