use std::panic::AssertUnwindSafe;

use actix_web::error::JsonPayloadError;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use futures_util::FutureExt;
use serde_json::json;

use crate::catalog::{is_supported_model, MODEL_CATALOG};
use crate::config::Settings;
use crate::error::ChatError;
use crate::format::{format_reply, log_chat_interaction, provider_health, HealthStatus};
use crate::models::{ChatDefaults, ChatRequest, ChatResponse, ValidationError};
use crate::provider::{CompletionRequest, ProviderHandle};
use crate::sanitize::sanitize_message;
use crate::system_prompt::create_system_prompt;

/// Shared application state used by the HTTP server and handlers.
pub struct AppState {
    /// Provider client slot; empty before startup completes and after teardown.
    pub provider: ProviderHandle,
    /// Defaults and bounds applied to `/chat` requests.
    pub defaults: ChatDefaults,
    /// System instruction sent with every completion.
    pub system_prompt: String,
}

impl AppState {
    pub fn new(provider: ProviderHandle, defaults: ChatDefaults, system_prompt: String) -> Self {
        Self {
            provider,
            defaults,
            system_prompt,
        }
    }

    pub fn from_settings(settings: &Settings, provider: ProviderHandle) -> Self {
        Self::new(
            provider,
            settings.chat_defaults(),
            create_system_prompt(settings.system_instructions.as_deref()),
        )
    }
}

/// JSON extractor config: decode failures become 422 (415 for a wrong
/// content type) with the standard error body.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        let chat_err = match err {
            JsonPayloadError::ContentType => ChatError::UnsupportedMediaType(
                req.headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string(),
            ),
            other => ChatError::Validation(ValidationError::Malformed(other.to_string())),
        };
        tracing::info!(
            path = %req.path(),
            category = chat_err.category(),
            "Rejected undecodable request body: {}",
            chat_err
        );
        chat_err.into()
    })
}

fn resource(path: &str) -> actix_web::Resource {
    web::resource(path).default_service(web::to(method_not_allowed))
}

/// Configure Actix-web routes with AppState.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(resource("/").route(web::get().to(root)))
        .service(resource("/health").route(web::get().to(health)))
        .service(resource("/health/provider").route(web::get().to(provider_health_check)))
        .service(resource("/models").route(web::get().to(list_models)))
        .service(resource("/chat").route(web::post().to(chat)))
        .default_service(web::to(not_found));
}

/// Liveness payload.
async fn root() -> impl Responder {
    web::Json(json!({
        "message": "Groq chatbot API is running!",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check reporting whether the provider client is live.
async fn health(state: web::Data<AppState>) -> impl Responder {
    let connected = state.provider.is_connected().await;
    web::Json(json!({
        "status": "healthy",
        "provider_client": if connected { "connected" } else { "disconnected" },
    }))
}

/// Detailed provider-client health with timestamp. 503 when absent.
async fn provider_health_check(state: web::Data<AppState>) -> HttpResponse {
    let report = provider_health(&state.provider).await;
    match report.status {
        HealthStatus::Healthy => HttpResponse::Ok().json(report),
        HealthStatus::Unhealthy => HttpResponse::ServiceUnavailable().json(report),
    }
}

/// Static model catalog.
async fn list_models(state: web::Data<AppState>) -> Result<HttpResponse, ChatError> {
    if !state.provider.is_connected().await {
        tracing::warn!("Model catalog requested while provider client is unavailable");
        return Err(ChatError::ServiceUnavailable);
    }
    Ok(HttpResponse::Ok().json(json!({ "models": MODEL_CATALOG })))
}

/// Main chat endpoint.
async fn chat(
    state: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, ChatError> {
    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let body = body.into_inner();
    tracing::info!(
        request_id = %request_id,
        requested_model = ?body.model,
        message_chars = body.message.chars().count(),
        "Chat request received"
    );

    let outcome = AssertUnwindSafe(process_chat(&state, &request_id, body))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ChatError::Internal(reason))
        });

    match outcome {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(err) => {
            log_failure(&request_id, &err);
            Err(err)
        }
    }
}

/// Received → Validated → Sanitized → Dispatched → Completed.
async fn process_chat(
    state: &AppState,
    request_id: &str,
    body: ChatRequest,
) -> Result<ChatResponse, ChatError> {
    let validated = body.validate(&state.defaults)?;

    let message = sanitize_message(&validated.message);
    if message.is_empty() {
        return Err(ValidationError::NothingLeftAfterSanitizing.into());
    }

    let provider = state
        .provider
        .current()
        .await
        .ok_or(ChatError::ServiceUnavailable)?;

    if !is_supported_model(&validated.model) {
        tracing::warn!(
            request_id,
            model = %validated.model,
            "Model is not in the advertised catalog; forwarding anyway"
        );
    }

    let completion_request = CompletionRequest {
        system_prompt: state.system_prompt.clone(),
        user_message: message,
        model: validated.model,
        max_tokens: validated.max_tokens,
        temperature: validated.temperature,
    };
    tracing::debug!(
        request_id,
        provider = provider.name(),
        model = %completion_request.model,
        max_tokens = completion_request.max_tokens,
        temperature = completion_request.temperature,
        "Dispatching to provider"
    );

    let completion = provider
        .complete(&completion_request)
        .await
        .map_err(|e| ChatError::provider(completion_request.model.clone(), e))?;

    let formatted = format_reply(
        &completion.reply,
        &completion_request.model,
        completion.tokens_used,
    );
    log_chat_interaction(request_id, &completion_request.user_message, &formatted);
    Ok(formatted.into())
}

fn log_failure(request_id: &str, err: &ChatError) {
    let category = err.category();
    match err {
        ChatError::Validation(_) | ChatError::UnsupportedMediaType(_) => {
            tracing::info!(request_id, category, "Chat request rejected: {}", err)
        }
        ChatError::ServiceUnavailable => {
            tracing::error!(request_id, category, "Provider client is not initialized")
        }
        ChatError::Provider { .. } => {
            tracing::warn!(request_id, category, "Chat request failed: {}", err)
        }
        ChatError::NotFound(_) | ChatError::Internal(_) => {
            tracing::error!(request_id, category, "Chat request failed: {}", err)
        }
    }
}

async fn method_not_allowed(req: HttpRequest) -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(crate::format::error_body(
        "MethodNotAllowed",
        format!("Method {} is not allowed on {}", req.method(), req.path()),
    ))
}

async fn not_found(req: HttpRequest) -> Result<HttpResponse, ChatError> {
    Err(ChatError::NotFound(req.path().to_string()))
}
