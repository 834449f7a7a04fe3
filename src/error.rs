//! HTTP-facing error taxonomy.
//!
//! Every failed request ends in exactly one [`ChatError`], which renders as an
//! [`ErrorResponse`](crate::models::ErrorResponse) body with a stable
//! category label.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};

use crate::format::error_body;
use crate::models::ValidationError;
use crate::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("provider client is not available")]
    ServiceUnavailable,

    #[error("{source} (model {model})")]
    Provider {
        model: String,
        #[source]
        source: ProviderError,
    },

    #[error("no route for {0}")]
    NotFound(String),

    /// Diagnostic text is logged, never returned to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn provider(model: impl Into<String>, source: ProviderError) -> Self {
        ChatError::Provider {
            model: model.into(),
            source,
        }
    }

    /// Stable category label for the `error` field.
    pub fn category(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "ValidationError",
            ChatError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            ChatError::ServiceUnavailable => "ServiceUnavailable",
            ChatError::Provider { source, .. } => source.category(),
            ChatError::NotFound(_) => "NotFound",
            ChatError::Internal(_) => "InternalError",
        }
    }

    /// Caller-safe description for the `detail` field.
    pub fn detail(&self) -> String {
        match self {
            ChatError::Validation(err) => err.to_string(),
            ChatError::UnsupportedMediaType(ct) => {
                format!("Content type '{ct}' is not supported; send application/json")
            }
            ChatError::ServiceUnavailable => "Groq service is not available".to_string(),
            ChatError::Provider { model, source } => match source {
                ProviderError::InvalidCredential(_) => "Invalid Groq API key".to_string(),
                ProviderError::RateLimited { .. } => {
                    "Rate limit exceeded. Please try again later.".to_string()
                }
                ProviderError::ModelNotFound(_) => format!("Model '{model}' is not available"),
                ProviderError::Unknown(_) => {
                    "An error occurred while processing your request".to_string()
                }
            },
            ChatError::NotFound(path) => format!("No route matches '{path}'"),
            ChatError::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl ResponseError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ChatError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Provider { source, .. } => match source {
                ProviderError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
                ProviderError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                ProviderError::ModelNotFound(_) => StatusCode::BAD_REQUEST,
                ProviderError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if let ChatError::Provider {
            source:
                ProviderError::RateLimited {
                    retry_after: Some(secs),
                    ..
                },
            ..
        } = self
        {
            builder.insert_header((header::RETRY_AFTER, secs.to_string()));
        }
        builder.json(error_body(self.category(), self.detail()))
    }
}
