use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails fast if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub groq_api_key: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_price_id_premium: String,
    pub stripe_price_id_premium_plus: String,
    /// Public base URL of the frontend — success/cancel/return targets for Stripe.
    pub base_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Quiescence window for draft auto-save, in milliseconds.
    pub autosave_debounce_ms: u64,
    /// TTL for cached unsaved drafts in Redis, in seconds.
    pub draft_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            groq_api_key: require_env("GROQ_API_KEY")?,
            stripe_secret_key: require_env("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: require_env("STRIPE_WEBHOOK_SECRET")?,
            stripe_price_id_premium: require_env("STRIPE_PRICE_ID_PREMIUM")?,
            stripe_price_id_premium_plus: require_env("STRIPE_PRICE_ID_PREMIUM_PLUS")?,
            base_url: require_env("BASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            autosave_debounce_ms: std::env::var("AUTOSAVE_DEBOUNCE_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse::<u64>()
                .context("AUTOSAVE_DEBOUNCE_MS must be a number of milliseconds")?,
            draft_cache_ttl_secs: std::env::var("DRAFT_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse::<u64>()
                .context("DRAFT_CACHE_TTL_SECS must be a number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
