//! TTS Service and Audio Assembler — Episode Builder stage 3 (spec §4.6).

pub mod assembler;
pub mod provider;
pub mod transcript;

use anyhow::Result;
use briefwave_core::TtsProvider;

use crate::script::Paragraph;
use assembler::{concatenate_with_crossfade, pcm_to_mp3, render_paragraphs, RenderedChunk};
use transcript::{build_segments, write_webvtt, TranscriptSegment};

pub struct EpisodeAudio {
    pub mp3_bytes: Vec<u8>,
    pub segments: Vec<TranscriptSegment>,
    pub webvtt: String,
    pub duration_seconds: f64,
}

/// Runs the full stage: fan-out render → crossfade concatenate → MP3
/// export → forced-timing transcript → WebVTT.
pub async fn assemble(
    provider: &dyn TtsProvider,
    paragraphs: &[Paragraph],
    batch_size: usize,
    crossfade_ms: u64,
    bitrate_kbps: u32,
) -> Result<EpisodeAudio> {
    let rendered: Vec<RenderedChunk> = render_paragraphs(provider, paragraphs, batch_size).await;

    let chunks: Vec<_> = rendered.iter().map(|r| r.chunk.clone()).collect();
    let (pcm, offsets) = concatenate_with_crossfade(&chunks, crossfade_ms);

    let sample_rate = chunks.first().map(|c| c.sample_rate).unwrap_or(24_000);
    let mp3_bytes = pcm_to_mp3(&pcm, sample_rate, bitrate_kbps)?;

    let segments = build_segments(&rendered, &offsets, paragraphs);
    let webvtt = write_webvtt(&segments);

    let duration_seconds = offsets.last().map(|o| o.end_seconds).unwrap_or(0.0);

    Ok(EpisodeAudio { mp3_bytes, segments, webvtt, duration_seconds })
}
