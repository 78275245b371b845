use ai_client::OpenAi;
use anyhow::Result;
use briefwave_core::FactorScores;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A candidate neighbor shown to the judge alongside the new article.
pub struct JudgeNeighbor {
    pub cluster_id: Uuid,
    pub title: String,
    pub similarity: f64,
}

/// Strict reply shape for the clustering judge (spec §4.1 step 4). All
/// fields are optional except `action`, since the source tolerates
/// partial/malformed judge output that we must still be able to parse
/// far enough to apply the declared fallbacks (spec §9 "dynamically
/// typed JSON from the LLM judge").
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct JudgeDecision {
    pub action: JudgeAction,
    pub cluster_id: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub surprise_score: Option<i32>,
    pub prominence_score: Option<i32>,
    pub magnitude_score: Option<i32>,
    pub emotion_score: Option<i32>,
    /// Nominally a float with one decimal; the source sometimes embeds
    /// it in prose. See [`extract_importance_score`] for the lenient
    /// fallback applied behind this strict field.
    pub importance_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JudgeAction {
    JoinExisting,
    CreateNew,
}

impl JudgeDecision {
    /// Factor scores with spec §4.1 step 5's "substitute 50" fallback
    /// applied to any missing/malformed value.
    pub fn factor_scores(&self) -> FactorScores {
        FactorScores {
            surprise: self.surprise_score.unwrap_or(50),
            prominence: self.prominence_score.unwrap_or(50),
            magnitude: self.magnitude_score.unwrap_or(50),
            emotion: self.emotion_score.unwrap_or(50),
        }
    }

    /// Resolved tags, defaulting to an empty list (the selector treats
    /// an empty tag list as simply not matching any custom tag).
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Builds the clustering judge prompt: the new article plus up to 5
/// most-similar neighbors (spec §4.1 step 4).
pub fn build_prompt(title: &str, summary: &str, neighbors: &[JudgeNeighbor]) -> (String, String) {
    let system = "You are a news clustering editor. Decide whether a new article \
        belongs to an existing story cluster or starts a new one, then score it \
        editorially. Reply with strictly valid JSON matching the given schema. \
        Discrete events within an ongoing series (different matches, different \
        quarterly reports, events more than 24 hours apart) should become \
        separate clusters even if topically related."
        .to_string();

    let mut user = format!("New article:\ntitle: {title}\nsummary: {summary}\n\n");
    if neighbors.is_empty() {
        user.push_str("No similar existing clusters were found.\n");
    } else {
        user.push_str("Candidate existing clusters (by embedding similarity):\n");
        for n in neighbors.iter().take(5) {
            user.push_str(&format!(
                "- cluster_id={} similarity={:.3} title={}\n",
                n.cluster_id, n.similarity, n.title
            ));
        }
    }
    user.push_str(
        "\nChoose action=join_existing (with cluster_id set to one of the candidates \
        above) or action=create_new. Provide subcategory from the standard news \
        taxonomy, 5-6 tags, four integer factor scores in [1,100] \
        (surprise, prominence, magnitude, emotion), and an aggregate importance_score \
        as a float with one decimal place.",
    );

    (system, user)
}

pub async fn invoke_judge(
    ai: &OpenAi,
    title: &str,
    summary: &str,
    neighbors: &[JudgeNeighbor],
) -> Result<JudgeDecision> {
    let (system, user) = build_prompt(title, summary, neighbors);
    ai.extract::<JudgeDecision>(ai.model(), system, user).await
}

/// Lenient fallback for `importance_score` when the raw judge payload
/// carried it as a string with embedded prose rather than a bare float
/// (spec §9 Open Question, resolved in DESIGN.md). Extracts the first
/// float-like substring.
pub fn extract_importance_score(raw: &str) -> Option<f64> {
    let re = Regex::new(r"-?\d+(\.\d+)?").ok()?;
    re.find(raw)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_float_from_prose() {
        assert_eq!(
            extract_importance_score("approximately 58.8 out of 100"),
            Some(58.8)
        );
    }

    #[test]
    fn extracts_bare_float() {
        assert_eq!(extract_importance_score("72.0"), Some(72.0));
    }

    #[test]
    fn missing_scores_fall_back_to_neutral_fifty() {
        let decision = JudgeDecision {
            action: JudgeAction::CreateNew,
            cluster_id: None,
            subcategory: None,
            tags: vec![],
            surprise_score: None,
            prominence_score: Some(80),
            magnitude_score: None,
            emotion_score: None,
            importance_score: None,
        };
        let scores = decision.factor_scores();
        assert_eq!(scores.surprise, 50);
        assert_eq!(scores.prominence, 80);
        assert_eq!(scores.magnitude, 50);
        assert_eq!(scores.emotion, 50);
    }
}
