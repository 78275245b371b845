pub mod adapters;
pub mod config;
pub mod deps;
pub mod error;
pub mod hashing;
pub mod types;

pub use adapters::{ArtifactStore, ContentExtractor, FeedItem, FeedSource, TtsChunk, TtsProvider, WordTiming};
pub use config::AppConfig;
pub use deps::{EmbeddingService, ServerDeps};
pub use error::PipelineError;
pub use hashing::uniqueness_hash;
pub use types::*;
