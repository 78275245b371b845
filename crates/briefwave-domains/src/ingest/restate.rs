//! `IngestionScheduler` — runs one polling cycle over every due feed,
//! grounded on the teacher's `SchedulerService`
//! (`modules/rootsignal-domains/src/scraping/restate/mod.rs`). Unlike the
//! episode pipeline, a polling cycle has no natural idempotency key
//! shared across invocations, so this is a plain `#[restate_sdk::service]`
//! rather than a virtual object.

use std::sync::Arc;

use briefwave_core::ServerDeps;
use restate_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use super::FeedSourceRow;
use crate::clustering;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCycleRequest {}
impl_restate_serde!(RunCycleRequest);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResult {
    pub feeds_polled: u32,
    pub items_seen: u32,
    pub articles_ingested: u32,
}
impl_restate_serde!(CycleResult);

#[restate_sdk::service]
#[name = "IngestionScheduler"]
pub trait IngestionScheduler {
    async fn run_cycle(req: RunCycleRequest) -> Result<CycleResult, HandlerError>;
}

pub struct IngestionSchedulerImpl {
    deps: Arc<ServerDeps>,
}

impl IngestionSchedulerImpl {
    pub fn with_deps(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }
}

impl IngestionScheduler for IngestionSchedulerImpl {
    async fn run_cycle(&self, ctx: Context<'_>, _req: RunCycleRequest) -> Result<CycleResult, HandlerError> {
        let deps = self.deps.clone();

        let result_json: String = ctx
            .run(|| async move {
                let result = run_due_feeds(&deps)
                    .await
                    .map_err(|e| TerminalError::new(format!("ingestion cycle failed: {e}")))?;
                serde_json::to_string(&result)
                    .map_err(|e| TerminalError::new(format!("serialize failed: {e}")).into())
            })
            .await?;

        serde_json::from_str(&result_json)
            .map_err(|e| TerminalError::new(format!("deserialize failed: {e}")).into())
    }
}

/// Polls every due feed sequentially within this worker (spec §4.1's
/// scheduling model: one pipeline invocation per article, sequential
/// within a worker), running each article through the clustering
/// pipeline as it arrives.
async fn run_due_feeds(deps: &ServerDeps) -> anyhow::Result<CycleResult> {
    let due = FeedSourceRow::find_due(deps.pool()).await?;

    let mut items_seen = 0u32;
    let mut articles_ingested = 0u32;

    for feed in &due {
        let items = match deps.feed_source.poll(&feed.feed_url, &feed.category_hint).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(feed_url = %feed.feed_url, error = %e, "feed poll failed, skipping");
                continue;
            }
        };

        items_seen += items.len() as u32;

        for item in &items {
            match clustering::pipeline::run(deps, item).await {
                Ok(Some(_)) => articles_ingested += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(url = %item.url, error = %e, "clustering pipeline failed for item");
                }
            }
        }

        FeedSourceRow::mark_polled(deps.pool(), feed.id).await?;
    }

    tracing::info!(
        feeds_polled = due.len(),
        items_seen,
        articles_ingested,
        "ingestion cycle completed"
    );

    Ok(CycleResult {
        feeds_polled: due.len() as u32,
        items_seen,
        articles_ingested,
    })
}
