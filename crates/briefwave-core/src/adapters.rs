use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw record discovered by polling a feed, before dedup/clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
    /// The feed's own category hint, used as the create-new fallback
    /// category when the clustering judge fails (spec §4.1).
    pub category_hint: String,
}

/// Polls one RSS/Atom feed and returns its recent items. Implemented by
/// `briefwave-domains::ingest::HttpFeedSource` via `feed-rs`.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn poll(&self, feed_url: &str, category_hint: &str) -> Result<Vec<FeedItem>>;
}

/// Fetches and extracts the main body text of an article URL. Never
/// raises — returns `None` on any failure (spec §4.4).
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Per-word timing for one synthesized chunk, when the provider supplies
/// it. Absent timings trigger the assembler's uniform-distribution
/// fallback (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// One rendered paragraph: 16-bit mono PCM samples plus optional
/// per-word timing.
#[derive(Debug, Clone)]
pub struct TtsChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub words: Option<Vec<WordTiming>>,
}

/// Renders one paragraph of text to speech. Implemented by
/// `briefwave-domains::audio::provider`.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<TtsChunk>;
}

/// Write-once-per-key artifact storage, addressed by URL (spec §6). The
/// object store itself is an external collaborator; this trait is the
/// seam a real bucket-backed adapter would implement.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}
