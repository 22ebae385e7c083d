use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub public_base_url: String,
    pub llm_provider: String,
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_models: Vec<String>,
    pub llm_max_retries: u32,
    pub llm_retry_backoff_ms: u64,
    pub ollama_url: String,
    pub payment_api_url: String,
    pub payment_secret_key: String,
    pub payment_webhook_secret: String,
    pub payment_currency: String,
    pub auth_webhook_secret: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "innkeeper.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "hosted".to_string()),
            llm_api_url: env::var("LLM_API_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            llm_api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            llm_models: parse_model_list(
                &env::var("LLM_MODELS")
                    .unwrap_or_else(|_| "llama-3.3-70b-versatile,llama-3.1-8b-instant".to_string()),
            ),
            llm_max_retries: env::var("LLM_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            llm_retry_backoff_ms: env::var("LLM_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            payment_api_url: env::var("PAYMENT_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            payment_secret_key: env::var("PAYMENT_SECRET_KEY").unwrap_or_default(),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET").unwrap_or_default(),
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            auth_webhook_secret: env::var("AUTH_WEBHOOK_SECRET").unwrap_or_default(),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            email_api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "bookings@innkeeper.local".to_string()),
        }
    }
}

/// Splits a comma-separated model list, dropping blanks.
pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
