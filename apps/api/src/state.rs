use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::draft::cache::DraftCache;
use crate::editor::session::SessionRegistry;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub llm: LlmClient,
    pub stripe: StripeClient,
    /// Write-through cache for unsaved drafts (Redis in production).
    pub draft_cache: Arc<dyn DraftCache>,
    /// Open editing sessions, each owning one auto-save driver.
    pub sessions: SessionRegistry,
    pub config: Config,
}
