use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use briefwave_core::{Episode, ServerDeps};
use briefwave_domains::episode::EpisodeRequest;
use briefwave_domains::taxonomy;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::restate_client::RestateClient;

#[derive(Clone)]
struct AppState {
    deps: Arc<ServerDeps>,
    restate: RestateClient,
}

pub fn build_router(deps: Arc<ServerDeps>) -> Router {
    let restate = RestateClient::new(
        deps.config.restate_self_url.clone().unwrap_or_else(|| format!("http://localhost:{}", deps.config.port)),
    );

    let cors = if deps.config.allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = deps.config.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health))
        .route("/episodes", post(create_episode).get(list_episodes))
        .route("/episodes/:episode_id", get(get_episode))
        .route("/categories", get(category_stats))
        .route("/ingest/run", post(trigger_ingestion_cycle))
        .layer(cors)
        .with_state(AppState { deps, restate })
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct CreateEpisodeBody {
    episode_id: Uuid,
    user_id: Uuid,
    subcategories: Vec<String>,
    duration_minutes: i32,
    #[serde(default)]
    custom_tags: Vec<String>,
}

#[derive(Serialize)]
struct CreateEpisodeReply {
    episode_id: Uuid,
    status: String,
}

/// Idempotent on `episode_id` (spec §6): redelivery of the same request
/// must not create a duplicate episode or re-dispatch the workflow.
async fn create_episode(State(state): State<AppState>, Json(body): Json<CreateEpisodeBody>) -> impl IntoResponse {
    let inserted = sqlx::query(
        "INSERT INTO episodes (id, user_id, title, description, subcategories, status) \
         VALUES ($1, $2, '', '', $3, 'pending') \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(body.episode_id)
    .bind(body.user_id)
    .bind(&body.subcategories)
    .execute(state.deps.pool())
    .await;

    let rows_affected = match inserted {
        Ok(result) => result.rows_affected(),
        Err(e) => {
            tracing::error!(error = %e, "failed to insert episode row");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to create episode").into_response();
        }
    };

    if rows_affected == 0 {
        // Episode already exists: redelivery of an already-dispatched
        // request. Report its current status instead of re-dispatching.
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM episodes WHERE id = $1")
            .bind(body.episode_id)
            .fetch_optional(state.deps.pool())
            .await;

        return match status {
            Ok(Some(status)) => Json(CreateEpisodeReply { episode_id: body.episode_id, status }).into_response(),
            Ok(None) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch existing episode status");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    let req = EpisodeRequest {
        episode_id: body.episode_id,
        user_id: body.user_id,
        subcategories: body.subcategories,
        duration_minutes: body.duration_minutes,
        custom_tags: body.custom_tags,
    };

    if let Err(e) = state.restate.run_episode(&req).await {
        tracing::error!(error = %e, "failed to dispatch EpisodeWorkflow");
        return (StatusCode::BAD_GATEWAY, "failed to start episode generation").into_response();
    }

    Json(CreateEpisodeReply { episode_id: body.episode_id, status: "pending".to_string() }).into_response()
}

/// Manual trigger for one ingestion/clustering cycle (spec §4.1). In
/// production a cron or Restate's own scheduled-invocation feature is
/// expected to call this on a cadence; this route exists so the cycle is
/// reachable without one.
async fn trigger_ingestion_cycle(State(state): State<AppState>) -> impl IntoResponse {
    match state.restate.run_ingestion_cycle().await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to dispatch IngestionScheduler");
            (StatusCode::BAD_GATEWAY, "failed to trigger ingestion cycle").into_response()
        }
    }
}

async fn get_episode(State(state): State<AppState>, Path(episode_id): Path<Uuid>) -> impl IntoResponse {
    let episode = sqlx::query_as::<_, Episode>("SELECT * FROM episodes WHERE id = $1")
        .bind(episode_id)
        .fetch_optional(state.deps.pool())
        .await;

    match episode {
        Ok(Some(e)) => Json(e).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch episode");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize)]
struct ListEpisodesQuery {
    user_id: Option<Uuid>,
    status: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    20
}

async fn list_episodes(State(state): State<AppState>, Query(q): Query<ListEpisodesQuery>) -> impl IntoResponse {
    let episodes = sqlx::query_as::<_, Episode>(
        "SELECT * FROM episodes \
         WHERE ($1::uuid IS NULL OR user_id = $1) \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC \
         LIMIT $3 OFFSET $4",
    )
    .bind(q.user_id)
    .bind(q.status)
    .bind(q.limit)
    .bind(q.offset)
    .fetch_all(state.deps.pool())
    .await;

    match episodes {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list episodes");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Serialize)]
struct SubcategoryStats {
    subcategory: &'static str,
    article_count: i64,
    mean_importance: f64,
}

#[derive(Serialize)]
struct CategoryStats {
    category: &'static str,
    subcategories: Vec<SubcategoryStats>,
}

/// Supplemented read-model endpoint (`episodes.py`'s `/categories`):
/// combines the closed taxonomy with live article counts and mean
/// cluster importance per subcategory.
async fn category_stats(State(state): State<AppState>) -> impl IntoResponse {
    let rows = match sqlx::query(
        "SELECT a.subcategory, COUNT(*) AS article_count, AVG(sc.importance) AS mean_importance \
         FROM articles a JOIN story_clusters sc ON sc.id = a.cluster_id \
         WHERE a.subcategory IS NOT NULL \
         GROUP BY a.subcategory",
    )
    .fetch_all(state.deps.pool())
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "failed to compute category stats");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let live: std::collections::HashMap<String, (i64, f64)> = rows
        .into_iter()
        .map(|r| {
            let sub: String = r.get("subcategory");
            let count: i64 = r.get("article_count");
            let mean: Option<f64> = r.get("mean_importance");
            (sub, (count, mean.unwrap_or(0.0)))
        })
        .collect();

    let stats: Vec<CategoryStats> = taxonomy::CATEGORIES
        .iter()
        .map(|c| CategoryStats {
            category: c.name,
            subcategories: c
                .subcategories
                .iter()
                .map(|sub| {
                    let (count, mean) = live.get(*sub).copied().unwrap_or((0, 0.0));
                    SubcategoryStats { subcategory: sub, article_count: count, mean_importance: mean }
                })
                .collect(),
        })
        .collect();

    Json(stats).into_response()
}
