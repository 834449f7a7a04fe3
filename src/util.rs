use std::path::Path;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Settings;

/// Apply an env file to the process environment, without overwriting
/// variables that are already set.
///
/// Lookup order:
/// - `explicit` (from `--env-file` / ENV_FILE)
/// - path in DOTENV_PATH
/// - `.env` in the working directory
///
/// Returns a description of the source used, or `"none"`.
pub fn load_env_file(explicit: Option<&Path>) -> String {
    if let Some(path) = explicit {
        if path.is_file() && dotenvy::from_path(path).is_ok() {
            return path.display().to_string();
        }
        tracing::warn!("Env file {} could not be loaded", path.display());
    }

    if let Ok(p) = std::env::var("DOTENV_PATH") {
        let p = p.trim();
        if !p.is_empty() && Path::new(p).is_file() && dotenvy::from_filename(p).is_ok() {
            return format!("{p} (DOTENV_PATH)");
        }
    }

    if dotenvy::dotenv().is_ok() {
        return ".env".into();
    }

    "none".into()
}

/// Initialize structured tracing.
///
/// RUST_LOG wins when set; otherwise `default_filter` is used
/// (e.g. the configured LOG_LEVEL).
pub fn init_tracing(default_filter: &str) {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("{default_filter},actix_web=info"));
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Build the outbound HTTP client for provider calls.
///
/// The overall request timeout comes from PROVIDER_TIMEOUT_SECONDS.
pub fn build_http_client(settings: &Settings) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(settings.provider_timeout)
        .pool_idle_timeout(std::time::Duration::from_secs(60))
        .user_agent(format!("groqbot/{}", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Build the CORS middleware from ALLOWED_ORIGINS.
///
/// "*" (or an empty list) allows any origin; otherwise only the listed
/// origins are accepted. Methods and headers are unrestricted.
pub fn cors_from_settings(settings: &Settings) -> actix_cors::Cors {
    let mut cors = actix_cors::Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

    if settings.allows_any_origin() {
        cors = cors.allow_any_origin();
    } else {
        for origin in &settings.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
        cors = cors.supports_credentials();
    }

    cors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_file_does_not_overwrite_existing_vars() {
        let _guard = ENV_LOCK.lock().expect("env lock");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "GROQBOT_TEST_FRESH=from-file").unwrap();
        writeln!(file, "GROQBOT_TEST_EXISTING=from-file").unwrap();

        std::env::set_var("GROQBOT_TEST_EXISTING", "from-process");
        std::env::remove_var("GROQBOT_TEST_FRESH");

        let source = load_env_file(Some(file.path()));
        assert_eq!(source, file.path().display().to_string());
        assert_eq!(std::env::var("GROQBOT_TEST_FRESH").unwrap(), "from-file");
        assert_eq!(
            std::env::var("GROQBOT_TEST_EXISTING").unwrap(),
            "from-process"
        );

        std::env::remove_var("GROQBOT_TEST_FRESH");
        std::env::remove_var("GROQBOT_TEST_EXISTING");
    }
}
