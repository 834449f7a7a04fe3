//! Request and response bodies of the public HTTP API.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_MAX_TOKENS: i64 = 1;
pub const MAX_MAX_TOKENS: i64 = 4096;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Body of `POST /chat` as received on the wire.
///
/// Numeric fields are decoded wide; bounds are checked by
/// [`ChatRequest::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Values applied when a request leaves an optional field out.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Upper bound on `message`, in characters.
    pub max_message_chars: usize,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: crate::config::DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            max_message_chars: 4000,
        }
    }
}

/// Structural or range violation in a chat request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("message must contain at least 1 character")]
    EmptyMessage,
    #[error("message must be at most {max} characters (got {actual})")]
    MessageTooLong { actual: usize, max: usize },
    /// Raised after sanitizing, not by [`ChatRequest::validate`]: the message
    /// met the length bound but held only whitespace or markup. This is the
    /// only 422 produced past the validation stage.
    #[error("message contains no text after sanitization")]
    NothingLeftAfterSanitizing,
    #[error("model must not be blank")]
    BlankModel,
    #[error("max_tokens must be between 1 and 4096 (got {0})")]
    MaxTokensOutOfRange(i64),
    #[error("temperature must be between 0.0 and 2.0 (got {0})")]
    TemperatureOutOfRange(f64),
    #[error("invalid request body: {0}")]
    Malformed(String),
}

/// A chat request whose fields are all present and within bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedChat {
    pub message: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ChatRequest {
    /// Check bounds and fill defaults. Never touches the provider.
    pub fn validate(&self, defaults: &ChatDefaults) -> Result<ValidatedChat, ValidationError> {
        let chars = self.message.chars().count();
        if chars == 0 {
            return Err(ValidationError::EmptyMessage);
        }
        if chars > defaults.max_message_chars {
            return Err(ValidationError::MessageTooLong {
                actual: chars,
                max: defaults.max_message_chars,
            });
        }

        let model = match self.model.as_deref() {
            Some(m) if m.trim().is_empty() => return Err(ValidationError::BlankModel),
            Some(m) => m.trim().to_string(),
            None => defaults.model.clone(),
        };

        let max_tokens = match self.max_tokens {
            Some(n) if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&n) => {
                return Err(ValidationError::MaxTokensOutOfRange(n));
            }
            Some(n) => n as u32,
            None => defaults.max_tokens,
        };

        let temperature = match self.temperature {
            Some(t) if !t.is_finite() || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) => {
                return Err(ValidationError::TemperatureOutOfRange(t));
            }
            Some(t) => t,
            None => defaults.temperature,
        };

        Ok(ValidatedChat {
            message: self.message.clone(),
            model,
            max_tokens,
            temperature,
        })
    }
}

/// Successful `POST /chat` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tokens_used: Option<u32>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable category label, e.g. `RateLimited`.
    pub error: String,
    /// Human-readable explanation safe to show to callers.
    pub detail: String,
    /// UTC ISO-8601 time the error was produced.
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let defaults = ChatDefaults::default();
        let validated = request("Hello AI!").validate(&defaults).unwrap();
        assert_eq!(validated.message, "Hello AI!");
        assert_eq!(validated.model, "llama-3.1-8b-instant");
        assert_eq!(validated.max_tokens, 1024);
        assert!((validated.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn explicit_fields_are_kept() {
        let req = ChatRequest {
            message: "Tell me a joke".into(),
            model: Some("mixtral-8x7b-32768".into()),
            max_tokens: Some(512),
            temperature: Some(0.9),
        };
        let validated = req.validate(&ChatDefaults::default()).unwrap();
        assert_eq!(validated.model, "mixtral-8x7b-32768");
        assert_eq!(validated.max_tokens, 512);
        assert!((validated.temperature - 0.9).abs() < 1e-6);
    }

    #[test]
    fn message_length_bounds() {
        let defaults = ChatDefaults::default();
        assert_eq!(
            request("").validate(&defaults),
            Err(ValidationError::EmptyMessage)
        );
        assert_eq!(
            request(&"x".repeat(5000)).validate(&defaults),
            Err(ValidationError::MessageTooLong {
                actual: 5000,
                max: 4000
            })
        );
        assert!(request(&"x".repeat(4000)).validate(&defaults).is_ok());
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let defaults = ChatDefaults::default();
        for (max_tokens, ok) in [(0, false), (1, true), (4096, true), (4097, false), (-5, false)] {
            let mut req = request("hi");
            req.max_tokens = Some(max_tokens);
            assert_eq!(req.validate(&defaults).is_ok(), ok, "max_tokens={max_tokens}");
        }
        for (temperature, ok) in [(-0.1, false), (0.0, true), (2.0, true), (3.0, false)] {
            let mut req = request("hi");
            req.temperature = Some(temperature);
            assert_eq!(
                req.validate(&defaults).is_ok(),
                ok,
                "temperature={temperature}"
            );
        }
    }

    #[test]
    fn blank_model_is_rejected() {
        let mut req = request("hi");
        req.model = Some("  ".into());
        assert_eq!(
            req.validate(&ChatDefaults::default()),
            Err(ValidationError::BlankModel)
        );
    }

    #[test]
    fn missing_tokens_are_omitted_from_response() {
        let body = ChatResponse {
            reply: "ok".into(),
            model_used: "gemma-7b-it".into(),
            tokens_used: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("tokens_used").is_none());
    }
}
