//! Provider Client Module
//!
//! Wraps the single outbound call to Groq's OpenAI-compatible
//! `/chat/completions` endpoint and turns every failure into a closed set of
//! [`ProviderError`] variants. Nothing above this module sees `reqwest` or raw
//! provider error payloads.
//!
//! ## Classification
//!
//! Failures are classified in three passes, most reliable first:
//!
//! 1. the structured `error.code` / `error.type` fields of the provider body
//! 2. the HTTP status (401/403, 429, 404)
//! 3. case-insensitive substring matching on the error message
//!
//! The substring pass is a heuristic of last resort. Anything it does not
//! recognize is [`ProviderError::Unknown`].
//!
//! The adapter never retries.

use async_trait::async_trait;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything needed for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Successful completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Text of the first choice, untrimmed.
    pub reply: String,
    /// Total tokens reported by the provider, if any.
    pub tokens_used: Option<u32>,
}

/// Provider failure, reclassified into the local taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider rejected credential: {0}")]
    InvalidCredential(String),

    #[error("provider rate limit: {message}")]
    RateLimited {
        message: String,
        /// Seconds, from the provider's `Retry-After` header.
        retry_after: Option<u64>,
    },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Stable category label used in logs and error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            ProviderError::InvalidCredential(_) => "InvalidCredential",
            ProviderError::RateLimited { .. } => "RateLimited",
            ProviderError::ModelNotFound(_) => "ModelNotFound",
            ProviderError::Unknown(_) => "UnknownProviderError",
        }
    }

    /// Substring fallback over a free-form provider message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("invalid_api_key") {
            ProviderError::InvalidCredential(message.to_string())
        } else if lower.contains("rate_limit") {
            ProviderError::RateLimited {
                message: message.to_string(),
                retry_after: None,
            }
        } else if lower.contains("model") && lower.contains("not found") {
            ProviderError::ModelNotFound(message.to_string())
        } else {
            ProviderError::Unknown(message.to_string())
        }
    }

    /// Classify an error response from the provider.
    pub fn classify(
        status: StatusCode,
        code: Option<&str>,
        kind: Option<&str>,
        message: &str,
        retry_after: Option<u64>,
    ) -> Self {
        let rate_limited = || ProviderError::RateLimited {
            message: message.to_string(),
            retry_after,
        };

        for signal in [code, kind].into_iter().flatten() {
            match signal.to_ascii_lowercase().as_str() {
                "invalid_api_key" | "invalid_authentication" | "authentication_error" => {
                    return ProviderError::InvalidCredential(message.to_string());
                }
                "rate_limit_exceeded" | "rate_limit_error" | "rate_limit" => {
                    return rate_limited();
                }
                "model_not_found" | "model_decommissioned" => {
                    return ProviderError::ModelNotFound(message.to_string());
                }
                _ => {}
            }
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return ProviderError::InvalidCredential(message.to_string());
            }
            StatusCode::TOO_MANY_REQUESTS => return rate_limited(),
            StatusCode::NOT_FOUND if message.to_ascii_lowercase().contains("model") => {
                return ProviderError::ModelNotFound(message.to_string());
            }
            _ => {}
        }

        match ProviderError::from_message(message) {
            ProviderError::RateLimited { message, .. } => ProviderError::RateLimited {
                message,
                retry_after,
            },
            other => other,
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one non-streaming completion with a system and a user turn.
    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "groq"
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

fn build_wire_request(req: &CompletionRequest) -> WireRequest<'_> {
    WireRequest {
        model: &req.model,
        messages: [
            WireMessage {
                role: "system",
                content: &req.system_prompt,
            },
            WireMessage {
                role: "user",
                content: &req.user_message,
            },
        ],
        max_tokens: req.max_tokens,
        temperature: req.temperature,
        stream: false,
    }
}

fn completion_from_wire(resp: WireResponse) -> Result<Completion, ProviderError> {
    let reply = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::Unknown("provider returned no completion choices".into()))?;
    Ok(Completion {
        reply,
        tokens_used: resp.usage.and_then(|u| u.total_tokens),
    })
}

fn error_from_body(status: StatusCode, body: &str, retry_after: Option<u64>) -> ProviderError {
    match serde_json::from_str::<WireErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope
                .error
                .message
                .unwrap_or_else(|| format!("provider returned {status}"));
            ProviderError::classify(
                status,
                envelope.error.code.as_deref(),
                envelope.error.kind.as_deref(),
                &message,
                retry_after,
            )
        }
        Err(_) => {
            let message = if body.trim().is_empty() {
                format!("provider returned {status}")
            } else {
                body.trim().to_string()
            };
            ProviderError::classify(status, None, None, &message, retry_after)
        }
    }
}

/// HTTP client for Groq's OpenAI-compatible API.
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GroqClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for GroqClient {
    async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
        let url = self.completions_url();
        tracing::debug!(model = %req.model, url = %url, "Dispatching completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&build_wire_request(req))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Unknown("provider request timed out".into())
                } else {
                    ProviderError::Unknown(format!("provider request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(error_from_body(status, &body, retry_after));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("failed to parse completion: {e}")))?;
        completion_from_wire(wire)
    }
}

/// Process-wide slot for the provider client.
///
/// Filled once at startup and emptied by [`ProviderHandle::teardown`] during
/// shutdown. Handlers clone the inner `Arc` per request; an empty slot means
/// the service is unavailable.
#[derive(Default)]
pub struct ProviderHandle {
    slot: RwLock<Option<Arc<dyn ChatProvider>>>,
}

impl ProviderHandle {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            slot: RwLock::new(Some(provider)),
        }
    }

    /// A handle with no provider, as after a failed startup.
    pub fn empty() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Arc<dyn ChatProvider>> {
        self.slot.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// Release the provider. Returns whether one was present.
    pub async fn teardown(&self) -> bool {
        self.slot.write().await.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "be brief".into(),
            user_message: "Hello AI!".into(),
            model: "llama-3.1-8b-instant".into(),
            max_tokens: 256,
            temperature: 0.5,
        }
    }

    #[test]
    fn wire_request_has_system_then_user_turn_and_no_streaming() {
        let req = request();
        let value = serde_json::to_value(build_wire_request(&req)).unwrap();
        assert_eq!(value["model"], "llama-3.1-8b-instant");
        assert_eq!(value["stream"], false);
        assert_eq!(value["max_tokens"], 256);
        let messages = value["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], json!({"role": "system", "content": "be brief"}));
        assert_eq!(messages[1], json!({"role": "user", "content": "Hello AI!"}));
    }

    #[test]
    fn completion_takes_first_choice_and_total_tokens() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 15, "total_tokens": 25}
        }))
        .unwrap();
        let completion = completion_from_wire(wire).unwrap();
        assert_eq!(completion.reply, "first");
        assert_eq!(completion.tokens_used, Some(25));
    }

    #[test]
    fn missing_usage_leaves_tokens_absent() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "hi"}}]
        }))
        .unwrap();
        assert_eq!(completion_from_wire(wire).unwrap().tokens_used, None);
    }

    #[test]
    fn empty_choices_is_unknown_error() {
        let wire: WireResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            completion_from_wire(wire),
            Err(ProviderError::Unknown(_))
        ));
    }

    #[test]
    fn structured_codes_win_over_status() {
        let body = json!({"error": {
            "message": "Rate limit reached for model",
            "type": "tokens",
            "code": "rate_limit_exceeded"
        }})
        .to_string();
        let err = error_from_body(StatusCode::BAD_REQUEST, &body, Some(7));
        assert_eq!(
            err,
            ProviderError::RateLimited {
                message: "Rate limit reached for model".into(),
                retry_after: Some(7),
            }
        );

        let body = json!({"error": {
            "message": "The model `nope` does not exist or you do not have access to it.",
            "type": "invalid_request_error",
            "code": "model_not_found"
        }})
        .to_string();
        assert!(matches!(
            error_from_body(StatusCode::NOT_FOUND, &body, None),
            ProviderError::ModelNotFound(_)
        ));

        let body = json!({"error": {
            "message": "Invalid API Key",
            "type": "invalid_request_error",
            "code": "invalid_api_key"
        }})
        .to_string();
        assert!(matches!(
            error_from_body(StatusCode::UNAUTHORIZED, &body, None),
            ProviderError::InvalidCredential(_)
        ));
    }

    #[test]
    fn status_is_used_when_codes_are_absent() {
        assert!(matches!(
            ProviderError::classify(StatusCode::UNAUTHORIZED, None, None, "denied", None),
            ProviderError::InvalidCredential(_)
        ));
        assert!(matches!(
            ProviderError::classify(StatusCode::TOO_MANY_REQUESTS, None, None, "slow down", Some(3)),
            ProviderError::RateLimited {
                retry_after: Some(3),
                ..
            }
        ));
        assert!(matches!(
            ProviderError::classify(StatusCode::NOT_FOUND, None, None, "model gone", None),
            ProviderError::ModelNotFound(_)
        ));
        assert!(matches!(
            ProviderError::classify(StatusCode::NOT_FOUND, None, None, "no such route", None),
            ProviderError::Unknown(_)
        ));
    }

    #[test]
    fn substring_fallback_is_case_insensitive() {
        assert!(matches!(
            ProviderError::from_message("Error code: INVALID_API_KEY"),
            ProviderError::InvalidCredential(_)
        ));
        assert!(matches!(
            ProviderError::from_message("hit Rate_Limit for org"),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_message("The Model was Not Found"),
            ProviderError::ModelNotFound(_)
        ));
        assert!(matches!(
            ProviderError::from_message("API Error"),
            ProviderError::Unknown(_)
        ));
    }

    #[test]
    fn non_json_error_body_falls_back_to_substrings() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            "upstream says rate_limit hit",
            Some(2),
        );
        assert_eq!(
            err,
            ProviderError::RateLimited {
                message: "upstream says rate_limit hit".into(),
                retry_after: Some(2),
            }
        );
        assert!(matches!(
            error_from_body(StatusCode::BAD_GATEWAY, "", None),
            ProviderError::Unknown(ref m) if m.contains("502")
        ));
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(
            ProviderError::InvalidCredential(String::new()).category(),
            "InvalidCredential"
        );
        assert_eq!(
            ProviderError::RateLimited {
                message: String::new(),
                retry_after: None
            }
            .category(),
            "RateLimited"
        );
        assert_eq!(
            ProviderError::ModelNotFound(String::new()).category(),
            "ModelNotFound"
        );
        assert_eq!(
            ProviderError::Unknown(String::new()).category(),
            "UnknownProviderError"
        );
    }

    #[test]
    fn debug_output_redacts_credential() {
        let client = GroqClient::new(reqwest::Client::new(), "http://x", "gsk_secret");
        let printed = format!("{client:?}");
        assert!(!printed.contains("gsk_secret"));
        assert!(printed.contains("<redacted>"));
    }

    struct Echo;

    #[async_trait]
    impl ChatProvider for Echo {
        async fn complete(&self, req: &CompletionRequest) -> Result<Completion, ProviderError> {
            Ok(Completion {
                reply: req.user_message.clone(),
                tokens_used: None,
            })
        }
    }

    #[tokio::test]
    async fn handle_teardown_empties_slot() {
        let handle = ProviderHandle::new(Arc::new(Echo));
        assert!(handle.is_connected().await);
        let provider = handle.current().await.expect("provider present");
        assert_eq!(provider.complete(&request()).await.unwrap().reply, "Hello AI!");

        assert!(handle.teardown().await);
        assert!(!handle.is_connected().await);
        assert!(handle.current().await.is_none());
        assert!(!handle.teardown().await);
        assert!(!ProviderHandle::empty().is_connected().await);
    }
}
