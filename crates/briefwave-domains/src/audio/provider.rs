//! HTTP-backed `TtsProvider` adapter, grounded on the teacher's plain
//! `HttpIngestor` shape (`scraping/adapters/http.rs`) — a thin
//! `reqwest::Client` wrapper with no retry logic of its own; retries are
//! the caller's (`assembler`'s) concern.

use async_trait::async_trait;
use briefwave_core::{TtsChunk, TtsProvider, WordTiming};
use serde::Deserialize;

const SYNTHESIZE_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct SynthesizeResponse {
    /// Base64-encoded 16-bit PCM samples, little-endian.
    audio_base64: String,
    sample_rate: u32,
    words: Option<Vec<WordTiming>>,
}

/// Calls a generic REST TTS endpoint that returns base64 PCM plus
/// optional per-word timestamps. The concrete provider (ElevenLabs,
/// Azure, etc.) is selected by `endpoint`/`api_key` at construction, not
/// by this adapter's code — matching the spec's "the TTS provider is an
/// external collaborator" framing (§2).
pub struct HttpTtsProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    voice_id: String,
}

impl HttpTtsProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(SYNTHESIZE_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builds with a static config");
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            voice_id: voice_id.into(),
        }
    }
}

#[async_trait]
impl TtsProvider for HttpTtsProvider {
    async fn synthesize(&self, text: &str) -> anyhow::Result<TtsChunk> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "text": text, "voice_id": self.voice_id }))
            .send()
            .await?
            .error_for_status()?
            .json::<SynthesizeResponse>()
            .await?;

        let bytes = base64_decode(&response.audio_base64)?;
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        Ok(TtsChunk {
            samples,
            sample_rate: response.sample_rate,
            words: response.words,
        })
    }
}

fn base64_decode(s: &str) -> anyhow::Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| anyhow::anyhow!("invalid base64 audio payload: {e}"))
}
