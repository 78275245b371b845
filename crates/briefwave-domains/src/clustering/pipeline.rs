use anyhow::{Context, Result};
use briefwave_core::{uniqueness_hash, FeedItem, PipelineError, ServerDeps};
use pgvector::Vector;
use sqlx::Row;
use uuid::Uuid;

use super::judge::{self, JudgeAction, JudgeDecision, JudgeNeighbor};
use crate::taxonomy;

/// Runs the full ingestion-clustering pipeline for one candidate article
/// (spec §4.1). Returns the new article id, or `None` if the record was
/// a duplicate.
pub async fn run(deps: &ServerDeps, item: &FeedItem) -> Result<Option<Uuid>> {
    // Step 1: duplicate check.
    let hash = uniqueness_hash(&item.url);
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE uniqueness_hash = $1)")
        .bind(&hash)
        .fetch_one(deps.pool())
        .await
        .context("duplicate check query failed")?;
    if exists {
        return Ok(None);
    }

    // Step 2: embed.
    let embedding_text = format!("{} {}", item.title, item.summary);
    let embedding = match deps.embedding_service.embed(&embedding_text).await {
        Ok(v) => v,
        Err(e) => {
            // Embedding failure is a transient-external condition: the
            // pipeline skips this article rather than failing the batch
            // (spec §4.2).
            tracing::warn!(error = %e, url = %item.url, "embedding failed, skipping article");
            return Ok(None);
        }
    };

    // Step 3: ANN search, similarity > 0.85, capped at 10.
    let threshold = deps.config.clustering_similarity_threshold;
    let vector = Vector::from(embedding.clone());

    sqlx::query(&format!("SET LOCAL hnsw.ef_search = {}", deps.config.hnsw_ef_search))
        .execute(deps.pool())
        .await
        .context("failed to set hnsw.ef_search")?;

    let rows = sqlx::query(
        "SELECT cluster_id, title, 1 - (embedding <=> $1) AS similarity \
         FROM articles \
         WHERE 1 - (embedding <=> $1) > $2 \
         ORDER BY embedding <=> $1 \
         LIMIT 10",
    )
    .bind(&vector)
    .bind(threshold)
    .fetch_all(deps.pool())
    .await
    .context("neighbor search failed")?;

    let neighbors: Vec<JudgeNeighbor> = rows
        .iter()
        .map(|r| JudgeNeighbor {
            cluster_id: r.get("cluster_id"),
            title: r.get("title"),
            similarity: r.get::<f64, _>("similarity"),
        })
        .collect();

    // Step 4/5: invoke the judge, with the declared fallback on LLM error.
    let decision = match judge::invoke_judge(&deps.ai, &item.title, &item.summary, &neighbors).await {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, url = %item.url, "clustering judge failed, using fallback");
            JudgeDecision {
                action: JudgeAction::CreateNew,
                cluster_id: None,
                subcategory: None,
                tags: vec![],
                surprise_score: None,
                prominence_score: None,
                magnitude_score: None,
                emotion_score: None,
                importance_score: None,
            }
        }
    };

    let (category, subcategory) = match &decision.subcategory {
        Some(sub) => match taxonomy::category_for_subcategory(sub) {
            Some(cat) => (cat.to_string(), Some(sub.clone())),
            None => (taxonomy::GENERAL.to_string(), None),
        },
        None => (item.category_hint.clone(), None),
    };

    let scores = decision.factor_scores();
    let importance = decision
        .importance_score
        .unwrap_or_else(|| scores.mean());

    let mut tx = deps.pool().begin().await?;

    let cluster_id = match decision.action {
        JudgeAction::JoinExisting => {
            let target = decision
                .cluster_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok())
                .or_else(|| neighbors.first().map(|n| n.cluster_id));

            match target {
                Some(id) => id,
                // No candidate at all despite join_existing: fall back
                // to creating a new cluster (contract violation, but
                // one with a safe default per spec §9).
                None => {
                    insert_cluster(&mut tx, &item.title, &scores, importance).await?
                }
            }
        }
        JudgeAction::CreateNew => insert_cluster(&mut tx, &item.title, &scores, importance).await?,
    };

    let article_id = Uuid::new_v4();
    let insert_result = sqlx::query(
        "INSERT INTO articles \
         (id, cluster_id, url, uniqueness_hash, source_name, title, summary, \
          published_at, category, subcategory, tags, embedding, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())",
    )
    .bind(article_id)
    .bind(cluster_id)
    .bind(&item.url)
    .bind(&hash)
    .bind(&item.source_name)
    .bind(&item.title)
    .bind(&item.summary)
    .bind(item.published_at)
    .bind(&category)
    .bind(&subcategory)
    .bind(&decision.tags())
    .bind(&vector)
    .execute(&mut *tx)
    .await;

    match insert_result {
        Ok(_) => {
            tx.commit().await?;
            tracing::info!(article_id = %article_id, cluster_id = %cluster_id, "article ingested");
            Ok(Some(article_id))
        }
        Err(e) if is_unique_violation(&e) => {
            // Concurrent insert of the same URL/hash by another worker
            // (spec §4.1 "benign race"): roll back and return null.
            tx.rollback().await.ok();
            Ok(None)
        }
        Err(e) => Err(PipelineError::TransientExternal(e.into()).into()),
    }
}

async fn insert_cluster(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    title: &str,
    scores: &briefwave_core::FactorScores,
    importance: f64,
) -> Result<Uuid> {
    let cluster_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO story_clusters \
         (id, canonical_title, surprise_score, prominence_score, magnitude_score, \
          emotion_score, importance, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, now())",
    )
    .bind(cluster_id)
    .bind(title)
    .bind(scores.surprise)
    .bind(scores.prominence)
    .bind(scores.magnitude)
    .bind(scores.emotion)
    .bind(importance)
    .execute(&mut **tx)
    .await?;
    Ok(cluster_id)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_resolution_falls_back_to_general_for_unknown_subcategory() {
        assert_eq!(taxonomy::category_for_subcategory("Not A Real Subcategory"), None);
    }
}
