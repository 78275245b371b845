//! Episode Pipeline — the one stage of this system that needs durable,
//! replay-safe execution (spec §4.7, §6): a virtual object keyed by
//! `episode_id`, directly grounded on the teacher's `ClusteringJob`
//! template (`modules/rootsignal-domains/src/clustering/restate/mod.rs`).
//! See `DESIGN.md` "Clustering vs. restate-sdk" for why clustering itself
//! does *not* use restate but this stage does.

use std::sync::Arc;

use briefwave_core::{ArtifactStore, Episode, EpisodeStatus, ServerDeps};
use chrono::Utc;
use restate_sdk::prelude::*;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::audio::{self, EpisodeAudio};
use crate::extraction::{self, HttpContentExtractor};
use crate::script::{self, AnchorArticle, PodcastScript};
use crate::selection::{self, Candidate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRequest {
    pub episode_id: Uuid,
    pub user_id: Uuid,
    pub subcategories: Vec<String>,
    pub duration_minutes: i32,
    pub custom_tags: Vec<String>,
}
impl_restate_serde!(EpisodeRequest);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub episode_id: Uuid,
    pub status: String,
}
impl_restate_serde!(EpisodeResult);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyRequest {}
impl_restate_serde!(EmptyRequest);

#[restate_sdk::object]
#[name = "EpisodeWorkflow"]
pub trait EpisodeWorkflow {
    async fn run(req: EpisodeRequest) -> Result<EpisodeResult, HandlerError>;

    #[shared]
    async fn get_status(req: EmptyRequest) -> Result<String, HandlerError>;
}

pub struct EpisodeWorkflowImpl {
    deps: Arc<ServerDeps>,
}

impl EpisodeWorkflowImpl {
    pub fn with_deps(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }
}

impl EpisodeWorkflow for EpisodeWorkflowImpl {
    async fn run(&self, ctx: ObjectContext<'_>, req: EpisodeRequest) -> Result<EpisodeResult, HandlerError> {
        // Idempotency: re-delivery of the same episode_id must not
        // restart a finished (or in-flight-from-a-prior-attempt) episode
        // (spec §6).
        if let Some(existing) = fetch_episode(&self.deps, req.episode_id)
            .await
            .map_err(|e| TerminalError::new(format!("idempotency check failed: {e}")))?
        {
            if existing.status != EpisodeStatus::Pending.to_string() {
                return Ok(EpisodeResult { episode_id: req.episode_id, status: existing.status });
            }
        }

        match self.run_pipeline(&ctx, &req).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!(episode_id = %req.episode_id, error = %e, "episode pipeline failed");
                set_status(&ctx, EpisodeStatus::Failed, Some(e.to_string()));
                let deps = self.deps.clone();
                let episode_id = req.episode_id;
                let error_text = e.to_string();
                ctx.run(|| async move {
                    mark_failed(&deps, episode_id, &error_text)
                        .await
                        .map_err(|e| TerminalError::new(format!("failed to persist failure: {e}")).into())
                })
                .await?;
                Ok(EpisodeResult { episode_id: req.episode_id, status: EpisodeStatus::Failed.to_string() })
            }
        }
    }

    async fn get_status(&self, ctx: SharedObjectContext<'_>, _req: EmptyRequest) -> Result<String, HandlerError> {
        Ok(ctx.get::<String>("status").await?.unwrap_or_else(|| "pending".to_string()))
    }
}

impl EpisodeWorkflowImpl {
    async fn run_pipeline(
        &self,
        ctx: &ObjectContext<'_>,
        req: &EpisodeRequest,
    ) -> anyhow::Result<EpisodeResult> {
        set_status(ctx, EpisodeStatus::DiscoveringArticles, None);

        let deps = self.deps.clone();
        let subcategories = req.subcategories.clone();
        let custom_tags = req.custom_tags.clone();
        let user_id = req.user_id;
        let candidates_json: String = ctx
            .run(|| async move {
                discover_articles(&deps, user_id, &subcategories, &custom_tags)
                    .await
                    .map_err(|e| TerminalError::new(format!("article selection failed: {e}")).into())
            })
            .await?;
        let candidates: Vec<Candidate> = serde_json::from_str(&candidates_json)?;

        set_status(ctx, EpisodeStatus::ExtractingContent, None);

        let deps = self.deps.clone();
        let candidates_for_extract = candidates.clone();
        let anchors_json: String = ctx
            .run(|| async move {
                extract_anchors(&deps, &candidates_for_extract)
                    .await
                    .map_err(|e| TerminalError::new(format!("content extraction failed: {e}")).into())
            })
            .await?;
        let anchors: Vec<AnchorArticle> = serde_json::from_str(&anchors_json)?;

        set_status(ctx, EpisodeStatus::GeneratingScript, None);

        let deps = self.deps.clone();
        let duration_minutes = req.duration_minutes as f64;
        let max_sources = deps.config.script_max_sources;
        let words_per_minute = deps.config.script_words_per_minute;
        let anchors_for_script = anchors.clone();
        let candidates_for_script = candidates.clone();
        let script_json: String = ctx
            .run(|| async move {
                draft_script(&deps, candidates_for_script, anchors_for_script, duration_minutes, max_sources, words_per_minute)
                    .await
                    .map_err(|e| TerminalError::new(format!("script drafting failed: {e}")).into())
            })
            .await?;
        let podcast_script: PodcastScriptWire = serde_json::from_str(&script_json)?;

        set_status(ctx, EpisodeStatus::GeneratingAudio, None);

        let deps = self.deps.clone();
        let tts_batch_size = deps.config.tts_batch_size;
        let crossfade_ms = deps.config.tts_crossfade_ms as u64;
        let bitrate_kbps = deps.config.audio_bitrate_kbps;
        let paragraphs_for_audio = podcast_script.paragraphs.clone();
        let audio_json: String = ctx
            .run(|| async move {
                render_audio(&deps, &paragraphs_for_audio, tts_batch_size, crossfade_ms, bitrate_kbps)
                    .await
                    .map_err(|e| TerminalError::new(format!("audio rendering failed: {e}")).into())
            })
            .await?;
        let episode_audio: EpisodeAudioWire = serde_json::from_str(&audio_json)?;

        set_status(ctx, EpisodeStatus::GeneratingTimestamps, None);
        // Transcript/WebVTT are produced alongside audio in `render_audio`;
        // this state exists purely as an observable stage per spec §4.7.

        set_status(ctx, EpisodeStatus::UploadingFiles, None);

        let deps = self.deps.clone();
        let episode_id = req.episode_id;
        let user_id = req.user_id;
        let mp3_bytes = episode_audio.mp3_bytes.clone();
        let transcript_json_bytes = serde_json::to_vec(&episode_audio.segments)?;
        let webvtt_bytes = episode_audio.webvtt.clone().into_bytes();
        let urls_json: String = ctx
            .run(|| async move {
                upload_artifacts(&deps, episode_id, user_id, mp3_bytes, transcript_json_bytes, webvtt_bytes)
                    .await
                    .map_err(|e| TerminalError::new(format!("artifact upload failed: {e}")).into())
            })
            .await?;
        let urls: ArtifactUrls = serde_json::from_str(&urls_json)?;

        set_status(ctx, EpisodeStatus::Finalizing, None);

        let deps = self.deps.clone();
        let episode_id = req.episode_id;
        let title = podcast_script.title.clone();
        let description = podcast_script.description.clone();
        let subcategories = req.subcategories.clone();
        let duration_seconds = episode_audio.duration_seconds;
        let segments = episode_audio.segments.clone();
        let sources = anchors.clone();
        let audio_url = urls.audio_url.clone();
        let transcript_url = urls.transcript_url.clone();
        let chapters_url = urls.chapters_url.clone();
        ctx.run(|| async move {
            finalize_episode(
                &deps,
                episode_id,
                &title,
                &description,
                &subcategories,
                duration_seconds,
                &audio_url,
                &transcript_url,
                &chapters_url,
                &segments,
                &sources,
            )
            .await
            .map_err(|e| TerminalError::new(format!("finalization failed: {e}")).into())
        })
        .await?;

        set_status(ctx, EpisodeStatus::Completed, None);

        Ok(EpisodeResult { episode_id: req.episode_id, status: EpisodeStatus::Completed.to_string() })
    }
}

fn set_status(ctx: &ObjectContext<'_>, status: EpisodeStatus, error: Option<String>) {
    ctx.set("status", status.to_string());
    ctx.set("progress", status.default_progress() as i64);
    if let Some(err) = error {
        ctx.set("error", err);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PodcastScriptWire {
    title: String,
    description: String,
    paragraphs: Vec<ParagraphWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParagraphWire {
    text: String,
    topic_label: String,
    source_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EpisodeAudioWire {
    mp3_bytes: Vec<u8>,
    segments: Vec<crate::audio::transcript::TranscriptSegment>,
    webvtt: String,
    duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactUrls {
    audio_url: String,
    transcript_url: String,
    chapters_url: String,
}

async fn fetch_episode(deps: &ServerDeps, episode_id: Uuid) -> anyhow::Result<Option<Episode>> {
    let row = sqlx::query_as::<_, Episode>("SELECT * FROM episodes WHERE id = $1")
        .bind(episode_id)
        .fetch_optional(deps.pool())
        .await?;
    Ok(row)
}

async fn mark_failed(deps: &ServerDeps, episode_id: Uuid, error: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE episodes SET status = 'failed', error = $2, updated_at = now() WHERE id = $1")
        .bind(episode_id)
        .bind(error)
        .execute(deps.pool())
        .await?;
    Ok(())
}

async fn discover_articles(
    deps: &ServerDeps,
    user_id: Uuid,
    subcategories: &[String],
    custom_tags: &[String],
) -> anyhow::Result<String> {
    let heard: std::collections::HashSet<Uuid> = sqlx::query(
        "SELECT DISTINCT cluster_id FROM source_references sr \
         JOIN episodes e ON e.id = sr.episode_id WHERE e.user_id = $1",
    )
    .bind(user_id)
    .fetch_all(deps.pool())
    .await?
    .into_iter()
    .map(|r| r.get("cluster_id"))
    .collect();

    let n = (deps.config.script_max_sources as usize).max(subcategories.len() + custom_tags.len());
    let candidates = selection::select_articles(deps, subcategories, custom_tags, &heard, n).await?;
    Ok(serde_json::to_string(&candidates)?)
}

async fn extract_anchors(deps: &ServerDeps, candidates: &[Candidate]) -> anyhow::Result<String> {
    let extractor = HttpContentExtractor::new();
    let mut anchors = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let row = sqlx::query("SELECT url, summary FROM articles WHERE id = $1")
            .bind(candidate.article_id)
            .fetch_one(deps.pool())
            .await?;
        let url: String = row.get("url");
        let summary: String = row.get("summary");

        let body = extraction::resolve_body(
            &extractor,
            deps.pool(),
            candidate.cluster_id,
            candidate.article_id,
            &url,
            &summary,
        )
        .await;

        anchors.push(AnchorArticle {
            article_id: candidate.article_id,
            cluster_id: candidate.cluster_id,
            title: summary.chars().take(120).collect(),
            body,
            importance: candidate.importance,
        });
    }

    Ok(serde_json::to_string(&anchors)?)
}

async fn draft_script(
    deps: &ServerDeps,
    candidates: Vec<Candidate>,
    anchors: Vec<AnchorArticle>,
    duration_minutes: f64,
    max_sources: usize,
    words_per_minute: f64,
) -> anyhow::Result<String> {
    let topics = script::group_topics(&candidates, &anchors, words_per_minute, duration_minutes);
    let podcast_script: PodcastScript = script::orchestrate(
        deps.ai.as_ref(),
        topics,
        anchors,
        max_sources,
        None,
        words_per_minute,
    )
    .await?;

    let wire = PodcastScriptWire {
        title: podcast_script.title,
        description: podcast_script.description,
        paragraphs: podcast_script
            .paragraphs
            .into_iter()
            .map(|p| ParagraphWire { text: p.text, topic_label: p.topic_label, source_ids: p.source_ids })
            .collect(),
    };
    Ok(serde_json::to_string(&wire)?)
}

async fn render_audio(
    deps: &ServerDeps,
    paragraphs: &[ParagraphWire],
    batch_size: usize,
    crossfade_ms: u64,
    bitrate_kbps: u32,
) -> anyhow::Result<String> {
    let paragraphs: Vec<script::Paragraph> = paragraphs
        .iter()
        .map(|p| script::Paragraph {
            text: p.text.clone(),
            topic_label: p.topic_label.clone(),
            source_ids: p.source_ids.clone(),
        })
        .collect();

    let audio: EpisodeAudio =
        audio::assemble(deps.tts_provider.as_ref(), &paragraphs, batch_size, crossfade_ms, bitrate_kbps).await?;

    let wire = EpisodeAudioWire {
        mp3_bytes: audio.mp3_bytes,
        segments: audio.segments,
        webvtt: audio.webvtt,
        duration_seconds: audio.duration_seconds,
    };
    Ok(serde_json::to_string(&wire)?)
}

/// Naming convention from spec §6: `audio/{episode_id}.mp3`,
/// `transcripts/{episode_id}.json`, `vtt/{episode_id}.vtt`, optionally
/// prefixed by `users/{user_id}/`.
async fn upload_artifacts(
    deps: &ServerDeps,
    episode_id: Uuid,
    user_id: Uuid,
    mp3_bytes: Vec<u8>,
    transcript_bytes: Vec<u8>,
    webvtt_bytes: Vec<u8>,
) -> anyhow::Result<String> {
    let prefix = format!("users/{user_id}");
    let store: &dyn ArtifactStore = deps.artifact_store.as_ref();

    let audio_url = store
        .put(&format!("{prefix}/audio/{episode_id}.mp3"), mp3_bytes, "audio/mpeg")
        .await?;
    let transcript_url = store
        .put(&format!("{prefix}/transcripts/{episode_id}.json"), transcript_bytes, "application/json")
        .await?;
    let chapters_url = store
        .put(&format!("{prefix}/vtt/{episode_id}.vtt"), webvtt_bytes, "text/vtt")
        .await?;

    Ok(serde_json::to_string(&ArtifactUrls { audio_url, transcript_url, chapters_url })?)
}

#[allow(clippy::too_many_arguments)]
async fn finalize_episode(
    deps: &ServerDeps,
    episode_id: Uuid,
    title: &str,
    description: &str,
    subcategories: &[String],
    duration_seconds: f64,
    audio_url: &str,
    transcript_url: &str,
    chapters_url: &str,
    segments: &[crate::audio::transcript::TranscriptSegment],
    sources: &[AnchorArticle],
) -> anyhow::Result<()> {
    let mut tx = deps.pool().begin().await?;

    sqlx::query(
        "UPDATE episodes SET title = $2, description = $3, subcategories = $4, \
         status = 'finalizing', duration_seconds = $5, audio_url = $6, \
         transcript_url = $7, chapters_url = $8, updated_at = now() WHERE id = $1",
    )
    .bind(episode_id)
    .bind(title)
    .bind(description)
    .bind(subcategories)
    .bind(duration_seconds)
    .bind(audio_url)
    .bind(transcript_url)
    .bind(chapters_url)
    .execute(&mut *tx)
    .await?;

    for (i, segment) in segments.iter().enumerate() {
        sqlx::query(
            "INSERT INTO episode_segments (id, episode_id, start_seconds, end_seconds, text, topic, order_index) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(episode_id)
        .bind(segment.start)
        .bind(segment.end)
        .bind(&segment.text)
        .bind(&segment.topic)
        .bind(i as i32)
        .execute(&mut *tx)
        .await?;
    }

    for anchor in sources {
        let row = sqlx::query("SELECT url, title, published_at, summary FROM articles WHERE id = $1")
            .bind(anchor.article_id)
            .fetch_one(&mut *tx)
            .await?;
        let url: String = row.get("url");
        let full_title: String = row.get("title");
        let published_at: Option<chrono::DateTime<Utc>> = row.get("published_at");
        let summary: String = row.get("summary");

        sqlx::query(
            "INSERT INTO source_references \
             (id, episode_id, article_id, cluster_id, title, url, published_at, excerpt, summary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::new_v4())
        .bind(episode_id)
        .bind(anchor.article_id)
        .bind(anchor.cluster_id)
        .bind(&full_title)
        .bind(&url)
        .bind(published_at)
        .bind(anchor.body.chars().take(280).collect::<String>())
        .bind(&summary)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE episodes SET status = 'completed', updated_at = now() WHERE id = $1")
        .bind(episode_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
