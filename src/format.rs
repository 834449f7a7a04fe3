//! Response shaping helpers shared by the handlers.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::models::{ChatResponse, ErrorResponse};
use crate::provider::ProviderHandle;

/// Current UTC time as an ISO-8601 / RFC 3339 string.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A completed chat turn with generation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedReply {
    pub reply: String,
    pub model_used: String,
    pub tokens_used: Option<u32>,
    pub timestamp: String,
    pub status: &'static str,
}

/// Normalize a provider reply. `model` and `tokens` pass through unchanged.
pub fn format_reply(reply: &str, model: &str, tokens: Option<u32>) -> FormattedReply {
    FormattedReply {
        reply: reply.trim().to_string(),
        model_used: model.to_string(),
        tokens_used: tokens,
        timestamp: utc_timestamp(),
        status: "success",
    }
}

impl From<FormattedReply> for ChatResponse {
    fn from(formatted: FormattedReply) -> Self {
        ChatResponse {
            reply: formatted.reply,
            model_used: formatted.model_used,
            tokens_used: formatted.tokens_used,
        }
    }
}

/// Error body with a category label and timestamp.
pub fn error_body(category: &str, detail: impl Into<String>) -> ErrorResponse {
    ErrorResponse {
        error: category.to_string(),
        detail: detail.into(),
        timestamp: utc_timestamp(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of [`provider_health`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHealth {
    pub status: HealthStatus,
    pub message: String,
    pub timestamp: String,
}

/// Report whether the provider client is present.
///
/// This is a liveness check of the local handle only; it makes no call to
/// the provider.
pub async fn provider_health(handle: &ProviderHandle) -> ProviderHealth {
    match handle.current().await {
        Some(provider) => ProviderHealth {
            status: HealthStatus::Healthy,
            message: format!("{} client is connected and ready", provider.name()),
            timestamp: utc_timestamp(),
        },
        None => ProviderHealth {
            status: HealthStatus::Unhealthy,
            message: "Provider client is not initialized".to_string(),
            timestamp: utc_timestamp(),
        },
    }
}

/// Log a finished chat interaction without its content.
pub fn log_chat_interaction(request_id: &str, user_message: &str, formatted: &FormattedReply) {
    tracing::info!(
        request_id,
        model = %formatted.model_used,
        user_message_chars = user_message.chars().count(),
        response_chars = formatted.reply.chars().count(),
        estimated_prompt_tokens = crate::sanitize::estimate_tokens(user_message),
        tokens_used = ?formatted.tokens_used,
        generated_at = %formatted.timestamp,
        "Chat request completed"
    );
}
