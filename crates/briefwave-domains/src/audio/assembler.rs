//! Audio assembly — renders script paragraphs to PCM via a bounded fan-out
//! of `tts.batch_size` concurrent calls, then concatenates with crossfade
//! and exports MP3 (spec §4.6).

use briefwave_core::{TtsChunk, TtsProvider, WordTiming};

use crate::script::Paragraph;

const SILENCE_FALLBACK_SECONDS: f64 = 2.0;
const UNIFORM_WORDS_PER_SECOND: f64 = 2.67;

/// One rendered chunk plus the paragraph metadata it came from.
pub struct RenderedChunk {
    pub paragraph_index: usize,
    pub is_framing: bool,
    pub chunk: TtsChunk,
}

/// Renders every paragraph to PCM, `batch_size` at a time. A paragraph
/// whose synthesis fails is replaced by `SILENCE_FALLBACK_SECONDS` of
/// silence at a nominal 24kHz sample rate and logged, never fails the
/// batch (spec §4.6 "Failure semantics").
pub async fn render_paragraphs(
    provider: &dyn TtsProvider,
    paragraphs: &[Paragraph],
    batch_size: usize,
) -> Vec<RenderedChunk> {
    let mut rendered = Vec::with_capacity(paragraphs.len());

    for batch in paragraphs.chunks(batch_size.max(1)) {
        let futures = batch.iter().enumerate().map(|(offset, paragraph)| {
            let base_index = rendered.len() + offset;
            async move {
                let is_framing = paragraph.topic_label == "Introduction" || paragraph.topic_label == "Outro";
                let chunk = match provider.synthesize(&paragraph.text).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(
                            paragraph_index = base_index,
                            error = %e,
                            "TTS rendering failed, substituting silence"
                        );
                        silence_chunk()
                    }
                };
                RenderedChunk { paragraph_index: base_index, is_framing, chunk }
            }
        });
        rendered.extend(futures::future::join_all(futures).await);
    }

    rendered
}

fn silence_chunk() -> TtsChunk {
    let sample_rate = 24_000u32;
    let samples = vec![0i16; (sample_rate as f64 * SILENCE_FALLBACK_SECONDS) as usize];
    TtsChunk { samples, sample_rate, words: None }
}

/// One chunk's position in the concatenated stream, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOffset {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Concatenates chunks with a linear crossfade between any two
/// non-first chunks, returning the combined 16-bit mono PCM stream (at
/// the first chunk's sample rate — chunks are assumed provider-uniform
/// per spec §4.6) plus each chunk's cumulative offset.
///
/// Cumulative offsets follow the "minus crossfade per boundary"
/// convention (spec §4.6 literal text); see `DESIGN.md` for why the
/// transcript's 250ms-pause convention is tracked separately.
pub fn concatenate_with_crossfade(chunks: &[TtsChunk], crossfade_ms: u64) -> (Vec<i16>, Vec<ChunkOffset>) {
    if chunks.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let sample_rate = chunks[0].sample_rate;
    let crossfade_samples = ((crossfade_ms as f64 / 1000.0) * sample_rate as f64).round() as usize;

    let mut combined: Vec<i16> = Vec::new();
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut cursor_seconds = 0.0;

    for (i, chunk) in chunks.iter().enumerate() {
        let duration_seconds = chunk.samples.len() as f64 / chunk.sample_rate as f64;
        let start_seconds = cursor_seconds;

        if i == 0 || combined.is_empty() {
            combined.extend_from_slice(&chunk.samples);
        } else {
            let fade_len = crossfade_samples.min(combined.len()).min(chunk.samples.len());
            let tail_start = combined.len() - fade_len;

            for j in 0..fade_len {
                let fade_out = 1.0 - (j as f64 / fade_len.max(1) as f64);
                let fade_in = j as f64 / fade_len.max(1) as f64;
                let mixed = combined[tail_start + j] as f64 * fade_out + chunk.samples[j] as f64 * fade_in;
                combined[tail_start + j] = mixed.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            }
            combined.extend_from_slice(&chunk.samples[fade_len..]);
        }

        let boundary_seconds = if i == 0 { 0.0 } else { crossfade_ms as f64 / 1000.0 };
        cursor_seconds = start_seconds + duration_seconds - boundary_seconds;
        offsets.push(ChunkOffset { start_seconds, end_seconds: cursor_seconds });
    }

    (combined, offsets)
}

/// Wraps 16-bit mono PCM in a WAV container (spec §4.6 "uniform 16-bit
/// mono WAV at the provider's native sample rate").
pub fn pcm_to_wav(samples: &[i16], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Encodes 16-bit mono PCM to MP3 at the configured bitrate (spec §4.6 /
/// §6 `audio.bitrate_kbps`).
pub fn pcm_to_mp3(samples: &[i16], sample_rate: u32, bitrate_kbps: u32) -> anyhow::Result<Vec<u8>> {
    use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm};

    let bitrate = match bitrate_kbps {
        96 => Bitrate::Kbps96,
        128 => Bitrate::Kbps128,
        192 => Bitrate::Kbps192,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        _ => Bitrate::Kbps128,
    };

    let mut builder = Builder::new().ok_or_else(|| anyhow::anyhow!("failed to initialize mp3 encoder"))?;
    builder.set_num_channels(1)?;
    builder.set_sample_rate(sample_rate)?;
    builder.set_brate(bitrate)?;
    let mut encoder = builder.build()?;

    let mut out = Vec::with_capacity(samples.len() / 2);
    let input = MonoPcm(samples);
    out.resize(mp3lame_encoder::max_required_buffer_size(samples.len()), 0);
    let written = encoder.encode(input, out.as_mut_slice())?;
    out.truncate(written);

    let mut tail = vec![0u8; 7200];
    let tail_written = encoder.flush::<FlushNoGap>(tail.as_mut_slice())?;
    tail.truncate(tail_written);
    out.extend_from_slice(&tail);

    Ok(out)
}

/// Fills in missing per-word timings with a uniform distribution at
/// 2.67 words/second (spec §4.6 fallback).
pub fn uniform_word_timings(text: &str, chunk_start_seconds: f64) -> Vec<WordTiming> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut timings = Vec::with_capacity(words.len());
    let mut cursor = chunk_start_seconds;
    for word in words {
        let duration = 1.0 / UNIFORM_WORDS_PER_SECOND;
        timings.push(WordTiming {
            word: word.to_string(),
            start_seconds: cursor,
            end_seconds: cursor + duration,
        });
        cursor += duration;
    }
    timings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(seconds: f64, sample_rate: u32) -> TtsChunk {
        TtsChunk {
            samples: vec![100i16; (seconds * sample_rate as f64) as usize],
            sample_rate,
            words: None,
        }
    }

    #[test]
    fn crossfade_offsets_subtract_boundary_per_spec() {
        let chunks = vec![chunk(2.0, 16_000), chunk(3.0, 16_000)];
        let (_, offsets) = concatenate_with_crossfade(&chunks, 50);
        assert_eq!(offsets.len(), 2);
        assert!((offsets[0].start_seconds - 0.0).abs() < 1e-6);
        assert!((offsets[0].end_seconds - 2.0).abs() < 1e-6);
        assert!((offsets[1].start_seconds - 2.0).abs() < 1e-6);
        // second chunk's end = 2.0 + 3.0 - 0.05
        assert!((offsets[1].end_seconds - 4.95).abs() < 1e-6);
    }

    #[test]
    fn concatenated_length_reflects_non_overlapping_samples() {
        let chunks = vec![chunk(1.0, 1000), chunk(1.0, 1000)];
        let (combined, _) = concatenate_with_crossfade(&chunks, 50);
        // 1000 + 1000 samples total, no duplicated crossfade region length.
        assert_eq!(combined.len(), 2000);
    }

    #[test]
    fn uniform_word_timings_advance_at_expected_rate() {
        let timings = uniform_word_timings("one two three", 0.0);
        assert_eq!(timings.len(), 3);
        assert!((timings[1].start_seconds - 1.0 / UNIFORM_WORDS_PER_SECOND).abs() < 1e-6);
    }

    #[test]
    fn pcm_to_wav_produces_nonempty_riff_container() {
        let wav = pcm_to_wav(&[0, 1, 2, 3], 8000).unwrap();
        assert!(wav.starts_with(b"RIFF"));
    }
}
