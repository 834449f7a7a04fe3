#![forbid(unsafe_code)]
#![doc = r#"
Groqbot

A small chatbot HTTP API: accept a user message, sanitize it, forward it to
Groq's OpenAI-compatible chat completions endpoint, and return the trimmed
reply with model and token metadata.

Crate highlights
- Library: the request pipeline (validation → sanitization → prompt → provider → formatting).
- HTTP server (in `server`): `/`, `/health`, `/health/provider`, `/models`, `/chat`.
- Provider: `ChatProvider` trait with a `reqwest`-based `GroqClient`; failures are
  reclassified into a closed `ProviderError` set.

Modules
- `models`: Request/response bodies and request validation.
- `sanitize`: Message cleanup and token estimation.
- `system_prompt`: System instruction assembly.
- `provider`: Provider trait, Groq client, error classification, provider handle.
- `format`: Reply/error shaping and provider health.
- `catalog`: Static model catalog.
- `error`: HTTP error taxonomy.
- `server`: Actix-web routes and handlers.
- `config`: Environment-derived settings.
- `util`: Env file loading, tracing, CORS, HTTP client.
"#]

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod provider;
pub mod sanitize;
pub mod server;
pub mod system_prompt;
pub mod util;

pub use crate::config::{ConfigError, Settings};
pub use crate::error::ChatError;
pub use crate::models::{ChatDefaults, ChatRequest, ChatResponse, ErrorResponse, ValidationError};
pub use crate::provider::{
    ChatProvider, Completion, CompletionRequest, GroqClient, ProviderError, ProviderHandle,
};
pub use crate::sanitize::{estimate_tokens, sanitize_message};
pub use crate::system_prompt::create_system_prompt;
