use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One ingested news item. Immutable after insertion except for
/// corrective re-categorization; never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: Uuid,
    pub cluster_id: Uuid,
    pub url: String,
    /// MD5(url), hex-encoded. See [`crate::uniqueness_hash`].
    pub uniqueness_hash: String,
    pub source_name: String,
    pub title: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    #[sqlx(try_from = "pgvector::Vector")]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Embedding vectors are fixed at 768 dimensions throughout the system.
pub const EMBEDDING_DIM: usize = 768;

/// The four editorial factor scores a clustering judge assigns, each on
/// the closed range [1, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FactorScores {
    pub surprise: i32,
    pub prominence: i32,
    pub magnitude: i32,
    pub emotion: i32,
}

impl FactorScores {
    pub const NEUTRAL: FactorScores = FactorScores {
        surprise: 50,
        prominence: 50,
        magnitude: 50,
        emotion: 50,
    };

    /// Mean of the four factors — the cluster's `importance`.
    pub fn mean(&self) -> f64 {
        (self.surprise + self.prominence + self.magnitude + self.emotion) as f64 / 4.0
    }
}

/// A group of articles reporting the same real-world event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoryCluster {
    pub id: Uuid,
    pub canonical_title: String,
    pub surprise_score: i32,
    pub prominence_score: i32,
    pub magnitude_score: i32,
    pub emotion_score: i32,
    pub importance: f64,
    pub created_at: DateTime<Utc>,
}

impl StoryCluster {
    pub fn factor_scores(&self) -> FactorScores {
        FactorScores {
            surprise: self.surprise_score,
            prominence: self.prominence_score,
            magnitude: self.magnitude_score,
            emotion: self.emotion_score,
        }
    }
}

/// Episode generation state machine (spec §4.7). Transitions are
/// unidirectional; `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    Pending,
    DiscoveringArticles,
    ExtractingContent,
    GeneratingScript,
    GeneratingAudio,
    GeneratingTimestamps,
    UploadingFiles,
    Finalizing,
    Completed,
    Failed,
}

impl EpisodeStatus {
    /// The progress percentage `podcast_generator.py` associates with
    /// this stage, carried as ambient, non-normative metadata.
    pub fn default_progress(&self) -> u8 {
        match self {
            EpisodeStatus::Pending => 0,
            EpisodeStatus::DiscoveringArticles => 10,
            EpisodeStatus::ExtractingContent => 20,
            EpisodeStatus::GeneratingScript => 40,
            EpisodeStatus::GeneratingAudio => 60,
            EpisodeStatus::GeneratingTimestamps => 80,
            EpisodeStatus::UploadingFiles => 90,
            EpisodeStatus::Finalizing => 95,
            EpisodeStatus::Completed => 100,
            EpisodeStatus::Failed => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EpisodeStatus::Completed | EpisodeStatus::Failed)
    }
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EpisodeStatus::Pending => "pending",
            EpisodeStatus::DiscoveringArticles => "discovering_articles",
            EpisodeStatus::ExtractingContent => "extracting_content",
            EpisodeStatus::GeneratingScript => "generating_script",
            EpisodeStatus::GeneratingAudio => "generating_audio",
            EpisodeStatus::GeneratingTimestamps => "generating_timestamps",
            EpisodeStatus::UploadingFiles => "uploading_files",
            EpisodeStatus::Finalizing => "finalizing",
            EpisodeStatus::Completed => "completed",
            EpisodeStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for EpisodeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => EpisodeStatus::Pending,
            "discovering_articles" => EpisodeStatus::DiscoveringArticles,
            "extracting_content" => EpisodeStatus::ExtractingContent,
            "generating_script" => EpisodeStatus::GeneratingScript,
            "generating_audio" => EpisodeStatus::GeneratingAudio,
            "generating_timestamps" => EpisodeStatus::GeneratingTimestamps,
            "uploading_files" => EpisodeStatus::UploadingFiles,
            "finalizing" => EpisodeStatus::Finalizing,
            "completed" => EpisodeStatus::Completed,
            "failed" => EpisodeStatus::Failed,
            other => anyhow::bail!("unknown episode status: {other}"),
        })
    }
}

/// One generated listening unit owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Episode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub subcategories: Vec<String>,
    pub status: String,
    pub stage: Option<String>,
    pub progress: Option<i32>,
    pub error: Option<String>,
    pub duration_seconds: Option<f64>,
    pub audio_url: Option<String>,
    pub transcript_url: Option<String>,
    pub chapters_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub played_at: Option<DateTime<Utc>>,
    pub play_progress_seconds: Option<f64>,
}

/// A contiguous, non-overlapping chapter of one episode's audio timeline.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EpisodeSegment {
    pub id: Uuid,
    pub episode_id: Uuid,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
    pub topic: Option<String>,
    pub order_index: i32,
}

/// Attribution of a segment to the article(s) that grounded it — the
/// "why this was in your episode" view.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceReference {
    pub id: Uuid,
    pub episode_id: Uuid,
    pub article_id: Uuid,
    pub cluster_id: Uuid,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub excerpt: String,
    pub summary: String,
}

/// External collaborator — only the three fields the core touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub subcategories: Vec<String>,
    pub custom_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_status_round_trips_through_display_and_from_str() {
        for status in [
            EpisodeStatus::Pending,
            EpisodeStatus::DiscoveringArticles,
            EpisodeStatus::ExtractingContent,
            EpisodeStatus::GeneratingScript,
            EpisodeStatus::GeneratingAudio,
            EpisodeStatus::GeneratingTimestamps,
            EpisodeStatus::UploadingFiles,
            EpisodeStatus::Finalizing,
            EpisodeStatus::Completed,
            EpisodeStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(EpisodeStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn factor_scores_mean_matches_importance_invariant() {
        let f = FactorScores {
            surprise: 60,
            prominence: 80,
            magnitude: 55,
            emotion: 40,
        };
        assert!((f.mean() - 58.75).abs() < 1e-9);
    }
}
