//! Article Selector — Episode Builder stage 1 (spec §4.3).

use anyhow::Result;
use briefwave_core::{PipelineError, ServerDeps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::collections::HashSet;
use uuid::Uuid;

use crate::taxonomy;

/// One candidate cluster (represented by its single highest-combined
/// article) competing for a selection slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub cluster_id: Uuid,
    pub article_id: Uuid,
    pub category: String,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub importance: f64,
    pub combined_score: f64,
}

/// `combined = (importance + COVERAGE_BOOST * ln(max(article_count, 1))) * exp(-age_hours * decay_rate[category])`
/// (spec §4.3).
pub fn combined_score(
    importance: f64,
    article_count: i64,
    age_hours: f64,
    category: &str,
    coverage_boost: f64,
) -> f64 {
    let count_term = coverage_boost * (article_count.max(1) as f64).ln();
    let decay = (-age_hours * taxonomy::decay_rate(category)).exp();
    (importance + count_term) * decay
}

/// Result of the three-phase selection algorithm: the chosen candidates
/// in selection order (phase order, not final presentation order).
pub fn select_candidates(
    mut candidates: Vec<Candidate>,
    subcategories: &[String],
    custom_tags: &[String],
    n: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));

    let mut chosen: Vec<Candidate> = Vec::new();
    let mut chosen_clusters: HashSet<Uuid> = HashSet::new();

    let is_selected = |chosen_clusters: &HashSet<Uuid>, c: &Candidate| chosen_clusters.contains(&c.cluster_id);

    // Phase 1(a): one guaranteed candidate per custom tag.
    for tag in custom_tags {
        let tag_lower = tag.to_lowercase();
        if let Some(best) = candidates
            .iter()
            .find(|c| !is_selected(&chosen_clusters, c) && c.tags.iter().any(|t| t.to_lowercase() == tag_lower))
        {
            chosen_clusters.insert(best.cluster_id);
            chosen.push(best.clone());
        } else {
            tracing::info!(tag = %tag, "no candidate found for custom tag guarantee");
        }
    }

    // Phase 1(b): if any World News region was requested, guarantee two
    // world-news candidates (any region, not necessarily the requested one).
    let wants_world_news = subcategories.iter().any(|s| taxonomy::is_world_news_region(s));
    if wants_world_news {
        let picks: Vec<Candidate> = candidates
            .iter()
            .filter(|c| {
                !is_selected(&chosen_clusters, c)
                    && c.subcategory.as_deref().map(taxonomy::is_world_news_region).unwrap_or(false)
            })
            .take(2)
            .cloned()
            .collect();
        for p in picks {
            chosen_clusters.insert(p.cluster_id);
            chosen.push(p);
        }
    }

    // Phase 2a: one guaranteed candidate per requested non-world-news subcategory.
    for sub in subcategories {
        if taxonomy::is_world_news_region(sub) {
            continue;
        }
        let already_has = chosen.iter().any(|c| c.subcategory.as_deref() == Some(sub.as_str()));
        if already_has {
            continue;
        }
        if let Some(best) = candidates
            .iter()
            .find(|c| !is_selected(&chosen_clusters, c) && c.subcategory.as_deref() == Some(sub.as_str()))
        {
            chosen_clusters.insert(best.cluster_id);
            chosen.push(best.clone());
        }
    }

    // Phase 2b: fill remaining slots by combined score desc.
    if chosen.len() < n {
        for c in candidates.iter() {
            if chosen.len() >= n {
                break;
            }
            if !is_selected(&chosen_clusters, c) {
                chosen_clusters.insert(c.cluster_id);
                chosen.push(c.clone());
            }
        }
    }

    chosen
}

/// Selects the N anchor articles for a new episode, given a user's
/// subcategory/tag preferences and the set of clusters already heard.
pub async fn select_articles(
    deps: &ServerDeps,
    subcategories: &[String],
    custom_tags: &[String],
    heard_clusters: &HashSet<Uuid>,
    n: usize,
) -> Result<Vec<Candidate>> {
    let freshness_days = deps.config.selection_freshness_days;
    let coverage_boost = deps.config.selection_coverage_boost;
    let min_importance = deps.config.selection_min_importance;

    let custom_tags_lower: Vec<String> = custom_tags.iter().map(|t| t.to_lowercase()).collect();

    let rows = sqlx::query(
        "SELECT DISTINCT ON (a.cluster_id) \
            a.cluster_id, a.id as article_id, a.category, a.subcategory, a.tags, \
            sc.importance, sc.article_count, \
            COALESCE(a.published_at, a.created_at) as ts \
         FROM articles a \
         JOIN (SELECT cluster_id, importance, article_count FROM story_cluster_stats) sc \
            ON sc.cluster_id = a.cluster_id \
         WHERE sc.importance >= $1 \
           AND COALESCE(a.published_at, a.created_at) >= now() - ($2 || ' days')::interval \
           AND (a.subcategory = ANY($3) OR EXISTS ( \
                SELECT 1 FROM unnest(a.tags) t WHERE lower(t) = ANY($4) \
           )) \
         ORDER BY a.cluster_id, sc.importance DESC",
    )
    .bind(min_importance)
    .bind(freshness_days.to_string())
    .bind(subcategories)
    .bind(&custom_tags_lower)
    .fetch_all(deps.pool())
    .await?;

    let now = Utc::now();
    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let cluster_id: Uuid = row.get("cluster_id");
        if heard_clusters.contains(&cluster_id) {
            continue;
        }
        let category: String = row.get("category");
        let importance: f64 = row.get("importance");
        let article_count: i64 = row.get("article_count");
        let ts: DateTime<Utc> = row.get("ts");
        let age_hours = (now - ts).num_seconds() as f64 / 3600.0;

        candidates.push(Candidate {
            cluster_id,
            article_id: row.get("article_id"),
            category: category.clone(),
            subcategory: row.get("subcategory"),
            tags: row.get("tags"),
            importance,
            combined_score: combined_score(importance, article_count, age_hours, &category, coverage_boost),
        });
    }

    let mut selected = select_candidates(candidates, subcategories, custom_tags, n);

    if selected.is_empty() {
        return Err(PipelineError::NoContent(
            "no new articles matched your preferences".to_string(),
        )
        .into());
    }

    // Reorder by raw importance desc for downstream convenience (spec §4.3).
    selected.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(cluster: u8, subcategory: &str, tags: &[&str], score: f64) -> Candidate {
        Candidate {
            cluster_id: Uuid::from_u128(cluster as u128),
            article_id: Uuid::new_v4(),
            category: taxonomy::category_for_subcategory(subcategory).unwrap_or("General").to_string(),
            subcategory: Some(subcategory.to_string()),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            importance: score,
            combined_score: score,
        }
    }

    #[test]
    fn combined_score_decays_with_age_and_boosts_with_coverage() {
        let fresh = combined_score(60.0, 1, 0.0, "Technology", 17.0);
        let old = combined_score(60.0, 1, 240.0, "Technology", 17.0);
        assert!(fresh > old);

        let single = combined_score(60.0, 1, 10.0, "Technology", 17.0);
        let many = combined_score(60.0, 10, 10.0, "Technology", 17.0);
        assert!(many > single);
    }

    #[test]
    fn three_phase_selection_matches_spec_scenario_3() {
        // 5 Europe, 4 Tennis, 3 AI & Machine Learning, 2 tagged "Jensen Huang".
        let mut candidates = Vec::new();
        for i in 0..5 {
            candidates.push(candidate(i, "Europe", &[], 90.0 - i as f64));
        }
        for i in 5..9 {
            candidates.push(candidate(i, "Tennis", &[], 80.0 - i as f64));
        }
        for i in 9..12 {
            candidates.push(candidate(i, "AI & Machine Learning", &[], 70.0 - i as f64));
        }
        for i in 12..14 {
            candidates.push(candidate(i, "Business", &["Jensen Huang"], 50.0));
        }
        for i in 14..20 {
            candidates.push(candidate(i, "Lifestyle", &[], 20.0 - i as f64 * 0.1));
        }

        let subs = vec!["Europe".to_string(), "Tennis".to_string(), "AI & Machine Learning".to_string()];
        let tags = vec!["Jensen Huang".to_string()];

        let chosen = select_candidates(candidates, &subs, &tags, 6);

        assert_eq!(chosen.len(), 6);
        let unique: HashSet<Uuid> = chosen.iter().map(|c| c.cluster_id).collect();
        assert_eq!(unique.len(), 6, "no cluster appears twice");

        let world_news_count = chosen.iter().filter(|c| c.subcategory.as_deref() == Some("Europe")).count();
        assert!(world_news_count >= 2, "at least 2 world-news picks guaranteed");

        let tag_count = chosen
            .iter()
            .filter(|c| c.tags.iter().any(|t| t.eq_ignore_ascii_case("Jensen Huang")))
            .count();
        assert!(tag_count >= 1, "custom tag guarantee satisfied");
    }

    #[test]
    fn custom_tags_match_case_insensitively() {
        let candidates = vec![candidate(1, "Business", &["jensen huang"], 50.0)];
        let chosen = select_candidates(candidates, &[], &["Jensen Huang".to_string()], 1);
        assert_eq!(chosen.len(), 1);
    }
}
