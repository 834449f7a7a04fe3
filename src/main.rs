use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;

use groqbot::provider::{ChatProvider, GroqClient, ProviderHandle};
use groqbot::server::{config_routes, AppState};
use groqbot::util::{build_http_client, cors_from_settings, init_tracing, load_env_file};
use groqbot::Settings;

/// Groq chatbot HTTP API.
#[derive(Debug, Parser)]
#[command(name = "groqbot", version, about)]
struct Cli {
    /// Env file to load before reading configuration.
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Host to bind to (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Log level (overrides LOG_LEVEL; RUST_LOG still wins).
    #[arg(long, value_parser = ["critical", "error", "warning", "info", "debug"])]
    log_level: Option<String>,

    /// Validate configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_source = load_env_file(cli.env_file.as_deref());

    let mut settings = match Settings::from_env() {
        Ok(s) => s,
        Err(err) => {
            init_tracing("info");
            tracing::error!("Configuration error: {}", err);
            return Err(err).context("failed to load configuration");
        }
    };
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }

    init_tracing(&settings.log_filter());
    tracing::info!("Environment loaded from: {}", env_source);

    if let Err(err) = settings.validate() {
        tracing::error!("Configuration validation failed: {}", err);
        return Err(err).context("invalid configuration");
    }
    if cli.check_config {
        tracing::info!(?settings, "Configuration validated successfully");
        return Ok(());
    }

    tracing::info!("Starting groqbot {}...", env!("CARGO_PKG_VERSION"));

    let http = build_http_client(&settings).context("failed to build HTTP client")?;
    let provider: Arc<dyn ChatProvider> = Arc::new(GroqClient::new(
        http,
        settings.groq_base_url.clone(),
        settings.groq_api_key.clone(),
    ));
    tracing::info!(base_url = %settings.groq_base_url, "Groq client initialized");

    let state = web::Data::new(AppState::from_settings(
        &settings,
        ProviderHandle::new(provider),
    ));

    let server_state = state.clone();
    let server_settings = settings.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors_from_settings(&server_settings))
            .app_data(server_state.clone())
            .configure(config_routes)
    })
    .bind((settings.host.as_str(), settings.port))
    .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?
    .run();

    tracing::info!(
        "Listening on http://{}:{} (default model {})",
        settings.host,
        settings.port,
        settings.default_model
    );
    server.await.context("server error")?;

    tracing::info!("Shutting down groqbot...");
    state.provider.teardown().await;
    Ok(())
}
