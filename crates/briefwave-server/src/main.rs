use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod restate_client;
mod routes;

use briefwave_domains::episode::EpisodeWorkflow;

/// Wrapper to make OpenAi implement our dyn-compatible EmbeddingService trait.
struct OpenAiEmbeddingService {
    ai: Arc<ai_client::OpenAi>,
}

#[async_trait]
impl briefwave_core::EmbeddingService for OpenAiEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use ai_client::EmbedAgent;
        self.ai.embed(text.to_string()).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use ai_client::EmbedAgent;
        self.ai.embed_batch(texts.to_vec()).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    tracing::info!("Starting briefwave-server");

    let config = briefwave_core::AppConfig::from_env()?;
    let port = config.port;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Migrations complete");

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let openai = Arc::new(ai_client::OpenAi::new(&config.openai_api_key, "gpt-4o"));
    let claude = config
        .anthropic_api_key
        .as_ref()
        .map(|key| Arc::new(ai_client::Claude::new(key, "claude-sonnet-4-5-20250929")));

    let feed_source: Arc<dyn briefwave_core::FeedSource> = Arc::new(briefwave_domains::ingest::HttpFeedSource::new());

    let content_extractor: Arc<dyn briefwave_core::ContentExtractor> =
        Arc::new(briefwave_domains::extraction::HttpContentExtractor::new());

    let embedding_service: Arc<dyn briefwave_core::EmbeddingService> =
        Arc::new(OpenAiEmbeddingService { ai: openai.clone() });

    let tts_provider: Arc<dyn briefwave_core::TtsProvider> = Arc::new(briefwave_domains::audio::provider::HttpTtsProvider::new(
        std::env::var("TTS_ENDPOINT").unwrap_or_default(),
        config.tts_api_key.clone().unwrap_or_default(),
        std::env::var("TTS_VOICE_ID").unwrap_or_default(),
    ));

    let artifact_store: Arc<dyn briefwave_core::ArtifactStore> = Arc::new(briefwave_domains::storage::FsArtifactStore::new(
        config.artifact_store_dir.clone(),
        std::env::var("ARTIFACT_PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:9080/artifacts".to_string()),
    ));

    let server_deps = Arc::new(briefwave_core::ServerDeps::new(
        pool.clone(),
        http_client,
        openai,
        claude,
        feed_source,
        content_extractor,
        embedding_service,
        tts_provider,
        artifact_store,
        config.clone(),
    ));

    // ─── Restate Endpoint ────────────────────────────────────────────────────

    let restate_endpoint = restate_sdk::endpoint::Endpoint::builder()
        .bind(briefwave_domains::episode::EpisodeWorkflowImpl::with_deps(server_deps.clone()).serve())
        .bind(briefwave_domains::ingest::restate::IngestionSchedulerImpl::with_deps(server_deps.clone()).serve())
        .build();

    // ─── Axum App (episode status / category routes) ────────────────────────

    let axum_app = routes::build_router(server_deps.clone());

    // ─── Start servers ───────────────────────────────────────────────────────

    let restate_addr = format!("0.0.0.0:{}", port);
    let axum_addr = format!("0.0.0.0:{}", port + 1);

    tracing::info!(restate = %restate_addr, axum = %axum_addr, "Starting servers");

    if let Some(admin_url) = &server_deps.config.restate_admin_url {
        let self_url = server_deps
            .config
            .restate_self_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let client = reqwest::Client::new();
        let mut request = client
            .post(format!("{}/deployments", admin_url))
            .json(&serde_json::json!({ "uri": self_url, "force": true }));

        if let Some(token) = &server_deps.config.restate_auth_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(resp) => tracing::info!(status = %resp.status(), "Registered with Restate admin"),
            Err(e) => tracing::warn!(error = %e, "Failed to register with Restate admin"),
        }
    }

    let restate_handle = tokio::spawn(async move {
        restate_sdk::http_server::HttpServer::new(restate_endpoint)
            .listen_and_serve(restate_addr.parse().unwrap())
            .await;
    });

    let axum_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(&axum_addr).await.unwrap();
        tracing::info!("Axum episode API at http://{}", axum_addr);
        axum::serve(listener, axum_app).await.unwrap();
    });

    tokio::select! {
        _ = restate_handle => {},
        _ = axum_handle => {},
    }

    Ok(())
}
