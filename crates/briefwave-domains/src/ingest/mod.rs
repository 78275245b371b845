//! RSS/Atom feed polling, grounded on the teacher's archive feed service
//! but adapted to the `FeedSource` seam (spec §4.1 "Ingestion trigger").

pub mod restate;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use briefwave_core::{FeedItem, FeedSource};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

const FEED_MAX_ITEMS: usize = 50;
const FEED_MAX_AGE_DAYS: i64 = 7;
const FETCH_TIMEOUT_SECS: u64 = 15;

/// One configured RSS/Atom feed, polled on its own cadence (spec §4.1
/// "multiple ingestor workers may run in parallel on disjoint feeds").
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedSourceRow {
    pub id: Uuid,
    pub feed_url: String,
    pub category_hint: String,
    pub cadence_minutes: i32,
}

impl FeedSourceRow {
    /// Feeds due for another poll: never polled, or past their cadence.
    pub async fn find_due(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, feed_url, category_hint, cadence_minutes FROM feed_sources \
             WHERE is_active \
               AND (last_polled_at IS NULL \
                    OR last_polled_at < now() - (cadence_minutes || ' minutes')::interval) \
             ORDER BY last_polled_at ASC NULLS FIRST",
        )
        .fetch_all(pool)
        .await
        .context("failed to load due feed sources")
    }

    pub async fn mark_polled(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE feed_sources SET last_polled_at = now() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to mark feed source as polled")?;
        Ok(())
    }
}

pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with a static config");
        Self { client }
    }
}

impl Default for HttpFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn poll(&self, feed_url: &str, category_hint: &str) -> Result<Vec<FeedItem>> {
        let response = self
            .client
            .get(feed_url)
            .header("User-Agent", "briefwave-ingest/0.1")
            .send()
            .await
            .context("feed fetch failed")?;

        let bytes = response.bytes().await.context("failed to read feed body")?;
        let feed = feed_rs::parser::parse(&bytes[..]).context("failed to parse RSS/Atom feed")?;

        let cutoff = Utc::now() - chrono::Duration::days(FEED_MAX_AGE_DAYS);
        let source_name = feed.title.map(|t| t.content).unwrap_or_else(|| feed_url.to_string());

        let mut items: Vec<FeedItem> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let url = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

                let title = entry.title.map(|t| t.content)?;
                let summary = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                let published_at = entry.published.or(entry.updated).map(|dt| dt.with_timezone(&Utc));

                if let Some(date) = published_at {
                    if date < cutoff {
                        return None;
                    }
                }

                Some(FeedItem {
                    url,
                    title,
                    summary,
                    source_name: source_name.clone(),
                    published_at,
                    category_hint: category_hint.to_string(),
                })
            })
            .collect();

        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(FEED_MAX_ITEMS);

        tracing::info!(feed_url, items = items.len(), "feed polled");

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_items_older_than_cutoff() {
        let cutoff = Utc::now() - chrono::Duration::days(FEED_MAX_AGE_DAYS);
        let recent = Utc::now();
        assert!(recent > cutoff);
    }
}
