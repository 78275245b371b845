//! Exercises the clustering pipeline end to end against a real
//! Postgres+pgvector instance (spec §4.1). Needs `OPENAI_API_KEY` for the
//! clustering judge, the same way the teacher's scout integration tests
//! need real Anthropic/Voyage keys; skips itself when absent.

mod harness;

use std::sync::Arc;

use ai_client::OpenAi;
use async_trait::async_trait;
use briefwave_core::{EmbeddingService, FeedItem, ServerDeps};
use briefwave_domains::clustering::pipeline;

/// Deterministic fake embedding: same text always yields the same vector,
/// so the ANN search in the second call finds the first article.
struct FixedEmbeddingService;

#[async_trait]
impl EmbeddingService for FixedEmbeddingService {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let seed = text.len() as f32;
        Ok(vec![seed; briefwave_core::EMBEDDING_DIM])
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }
}

fn test_config() -> briefwave_core::AppConfig {
    briefwave_core::AppConfig {
        database_url: String::new(),
        port: 0,
        allowed_origins: vec![],
        openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
        anthropic_api_key: None,
        openrouter_api_key: None,
        tts_api_key: None,
        restate_admin_url: None,
        restate_self_url: None,
        restate_auth_token: None,
        artifact_store_dir: "./artifacts".to_string(),
        clustering_similarity_threshold: 0.85,
        hnsw_ef_search: 100,
        selection_freshness_days: 5,
        selection_coverage_boost: 17.0,
        selection_min_importance: 40.0,
        script_words_per_minute: 120.0,
        script_max_sources: 10,
        tts_batch_size: 8,
        tts_crossfade_ms: 50,
        audio_bitrate_kbps: 128,
    }
}

#[tokio::test]
async fn duplicate_url_is_ingested_once() {
    let Ok(openai_key) = std::env::var("OPENAI_API_KEY") else {
        eprintln!("skipping: OPENAI_API_KEY not set");
        return;
    };

    let (_container, pool) = harness::pgvector_container().await;

    let deps = Arc::new(ServerDeps::new(
        pool,
        reqwest::Client::new(),
        Arc::new(OpenAi::new(&openai_key, "gpt-4o")),
        None,
        Arc::new(briefwave_domains::ingest::HttpFeedSource::new()),
        Arc::new(briefwave_domains::extraction::HttpContentExtractor::new()),
        Arc::new(FixedEmbeddingService),
        Arc::new(briefwave_domains::audio::provider::HttpTtsProvider::new("", "", "")),
        Arc::new(briefwave_domains::storage::FsArtifactStore::new("./artifacts-test", "https://cdn.example.com")),
        test_config(),
    ));

    let item = FeedItem {
        url: "https://example.com/story-one".to_string(),
        title: "Local council approves new park".to_string(),
        summary: "The council voted 5-2 to approve funding for a new park.".to_string(),
        source_name: "Example Times".to_string(),
        published_at: Some(chrono::Utc::now()),
        category_hint: "Local".to_string(),
    };

    let first = pipeline::run(&deps, &item).await.expect("first ingestion should succeed");
    assert!(first.is_some(), "first ingestion of a new URL must insert an article");

    let second = pipeline::run(&deps, &item).await.expect("re-ingestion should not error");
    assert!(second.is_none(), "re-ingesting the same URL must be a no-op (spec §4.1 benign race)");
}
