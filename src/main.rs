use std::sync::{Arc, Mutex};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use innkeeper::config::AppConfig;
use innkeeper::db;
use innkeeper::handlers;
use innkeeper::services::ai::hosted::HostedProvider;
use innkeeper::services::ai::ollama::OllamaProvider;
use innkeeper::services::ai::LlmProvider;
use innkeeper::services::email::http::HttpMailer;
use innkeeper::services::email::{LogMailer, Mailer};
use innkeeper::services::payments::hosted::HostedCheckoutProvider;
use innkeeper::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(!config.llm_models.is_empty(), "LLM_MODELS must list at least one model");

    let conn = db::init_db(&config.database_url)?;

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {})", config.ollama_url);
            Box::new(OllamaProvider::new(config.ollama_url.clone()))
        }
        _ => {
            anyhow::ensure!(
                !config.llm_api_key.is_empty(),
                "LLM_API_KEY must be set when LLM_PROVIDER=hosted"
            );
            tracing::info!(
                "using hosted LLM provider (url: {}, models: {})",
                config.llm_api_url,
                config.llm_models.join(", ")
            );
            Box::new(HostedProvider::new(
                config.llm_api_url.clone(),
                config.llm_api_key.clone(),
            ))
        }
    };

    let mailer: Box<dyn Mailer> = if config.email_api_key.is_empty() {
        tracing::warn!("EMAIL_API_KEY not set, confirmation emails will only be logged");
        Box::new(LogMailer)
    } else {
        Box::new(HttpMailer::new(
            config.email_api_url.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        ))
    };

    if config.payment_webhook_secret.is_empty() || config.auth_webhook_secret.is_empty() {
        tracing::warn!("webhook secrets missing, signature validation is disabled");
    }

    let payments = HostedCheckoutProvider::new(
        config.payment_api_url.clone(),
        config.payment_secret_key.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        llm,
        mailer,
        payments: Box::new(payments),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
