use crate::adapters::{ArtifactStore, ContentExtractor, FeedSource, TtsProvider};
use crate::config::AppConfig;
use ai_client::OpenAi;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Dyn-compatible embedding trait (wraps `ai_client::EmbedAgent`).
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Central dependency container passed to all handlers and workflows.
/// Constructed once at startup; all mutation happens through the pool
/// or the adapters it holds, never through process-wide state (spec §9
/// "global singletons" note).
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub http_client: reqwest::Client,
    pub ai: Arc<OpenAi>,
    pub claude: Option<Arc<ai_client::Claude>>,
    pub feed_source: Arc<dyn FeedSource>,
    pub content_extractor: Arc<dyn ContentExtractor>,
    pub embedding_service: Arc<dyn EmbeddingService>,
    pub tts_provider: Arc<dyn TtsProvider>,
    pub artifact_store: Arc<dyn ArtifactStore>,
    pub config: AppConfig,
}

impl ServerDeps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        http_client: reqwest::Client,
        ai: Arc<OpenAi>,
        claude: Option<Arc<ai_client::Claude>>,
        feed_source: Arc<dyn FeedSource>,
        content_extractor: Arc<dyn ContentExtractor>,
        embedding_service: Arc<dyn EmbeddingService>,
        tts_provider: Arc<dyn TtsProvider>,
        artifact_store: Arc<dyn ArtifactStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            db_pool,
            http_client,
            ai,
            claude,
            feed_source,
            content_extractor,
            embedding_service,
            tts_provider,
            artifact_store,
            config,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db_pool
    }
}
