mod config;
mod constants;
mod credentials;
mod error;
mod notify;
mod prompt;
mod reference_files;
mod relay;
mod routes;
mod session;

use config::AppConfig;
use constants::{env_vars, network};
use routes::AppState;

#[tokio::main]
async fn main() {
    // Initialize logging; RUST_LOG=debug mirrors the generated stream in the console
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = AppConfig::from_env();
    reference_files::ensure_dir(&config.reference_dir).await;

    let addr = format!("{}:{}", config.host, config.port);
    log::info!(
        "Starting figma-compose with Gemini model '{}' ({:?} context). Open http://127.0.0.1:{} in your browser.",
        config.generation.model,
        config.context_strategy,
        config.port
    );
    log::info!(
        "Set API tokens & Slack Webhook via UI or as environment variables: '{}', '{}', '{}'.",
        env_vars::FIGMA_TOKEN,
        env_vars::GEMINI_API_KEY,
        env_vars::SLACK_WEBHOOK_URL
    );
    log::info!(
        "Optionally, set '{}' to change the port (default: {}).",
        network::PORT_ENV_VAR,
        network::DEFAULT_PORT
    );
    log::info!(
        "Place your custom reference files (ending with .{}) in '{}'.",
        config.reference_extension,
        config.reference_dir.display()
    );

    let app = routes::router(AppState::new(config));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    log::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("HTTP server error: {}", e);
        std::process::exit(1);
    }
}
