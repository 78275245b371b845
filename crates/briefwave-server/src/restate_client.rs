//! Thin client for dispatching the `EpisodeWorkflow` via the Restate HTTP
//! ingress — the SDK has no ingress client of its own, so this wraps
//! reqwest the same way `rootsignal-api`'s `restate_client.rs` does.

use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RestateError {
    #[error("Restate ingress error (HTTP {status}): {body}")]
    Ingress { status: u16, body: String },

    #[error("Restate unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct RestateClient {
    http: Client,
    ingress_url: String,
}

impl RestateClient {
    pub fn new(ingress_url: String) -> Self {
        Self { http: Client::new(), ingress_url }
    }

    /// Dispatch `EpisodeWorkflow/{episode_id}/run`, keyed by `episode_id`
    /// so re-delivery hits the same virtual object instance (spec §6).
    pub async fn run_episode(
        &self,
        req: &briefwave_domains::episode::EpisodeRequest,
    ) -> Result<(), RestateError> {
        let url = format!("{}/EpisodeWorkflow/{}/run", self.ingress_url, req.episode_id);
        let resp = self.http.post(&url).json(req).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(RestateError::Ingress { status, body })
        }
    }

    /// Fetch the durable `status` key from `EpisodeWorkflow`'s shared handler.
    pub async fn get_status(&self, episode_id: Uuid) -> Result<String, RestateError> {
        let url = format!("{}/EpisodeWorkflow/{}/get_status", self.ingress_url, episode_id);
        let resp = self.http.post(&url).json(&serde_json::json!({})).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(RestateError::Ingress { status, body })
        }
    }

    /// Trigger one `IngestionScheduler.run_cycle` (spec §4.1's poll trigger).
    pub async fn run_ingestion_cycle(
        &self,
    ) -> Result<briefwave_domains::ingest::restate::CycleResult, RestateError> {
        let url = format!("{}/IngestionScheduler/run_cycle", self.ingress_url);
        let resp = self.http.post(&url).json(&serde_json::json!({})).send().await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(RestateError::Ingress { status, body })
        }
    }
}
