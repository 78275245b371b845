//! Forced-timing transcript assembly and the hand-rolled WebVTT chapter
//! writer (spec §4.6). Grounded in `transcript_service.py`'s
//! `generate_webvtt()` / `_format_webvtt_time()` for the exact cue
//! format and the 250ms timing-only pause convention (see `DESIGN.md`
//! Open Question resolutions).

use briefwave_core::WordTiming;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assembler::{uniform_word_timings, ChunkOffset, RenderedChunk};
use crate::script::Paragraph;

const VIRTUAL_PAUSE_SECONDS: f64 = 0.25;
const CHAPTER_FALLBACK_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub topic: Option<String>,
    pub source_ids: Vec<Uuid>,
    pub words: Option<Vec<WordTiming>>,
}

/// Builds one segment per non-framing paragraph. Intro/outro paragraphs
/// advance the clock (via their `ChunkOffset`) but emit no segment.
///
/// The 250ms virtual pause is added between paragraphs *only* when the
/// paragraph's words came from the provider's real per-word timestamps;
/// uniform-fallback chunks use the chunk's own cumulative offset
/// unmodified, since the fallback's word spacing already assumes
/// continuous narration with no gap (spec's Open Question — see
/// `DESIGN.md`).
pub fn build_segments(rendered: &[RenderedChunk], offsets: &[ChunkOffset], paragraphs: &[Paragraph]) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut pause_accumulated = 0.0;

    for (rendered_chunk, offset) in rendered.iter().zip(offsets.iter()) {
        let paragraph = &paragraphs[rendered_chunk.paragraph_index];

        let had_real_timestamps = rendered_chunk.chunk.words.is_some();
        let pause_for_this_chunk = if had_real_timestamps { VIRTUAL_PAUSE_SECONDS } else { 0.0 };

        let start = offset.start_seconds + pause_accumulated;
        let end = offset.end_seconds + pause_accumulated + pause_for_this_chunk;

        if rendered_chunk.is_framing {
            pause_accumulated += pause_for_this_chunk;
            continue;
        }

        let words = rendered_chunk
            .chunk
            .words
            .clone()
            .unwrap_or_else(|| uniform_word_timings(&paragraph.text, start));

        segments.push(TranscriptSegment {
            start,
            end,
            text: paragraph.text.clone(),
            topic: Some(paragraph.topic_label.clone()),
            source_ids: paragraph.source_ids.clone(),
            words: Some(words),
        });

        pause_accumulated += pause_for_this_chunk;
    }

    segments
}

/// Writes segments as a WebVTT chapter file: one cue per segment, cue
/// text = topic name if present else the first 50 characters of the
/// segment text.
pub fn write_webvtt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in segments {
        let cue_text = segment
            .topic
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| segment.text.chars().take(CHAPTER_FALLBACK_CHARS).collect());

        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_webvtt_time(segment.start),
            format_webvtt_time(segment.end),
            cue_text
        ));
    }
    out
}

fn format_webvtt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as i64;
    let ms = total_ms % 1000;
    let total_seconds = total_ms / 1000;
    let secs = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let mins = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours:02}:{mins:02}:{secs:02}.{ms:03}")
}

/// Parses a WebVTT document written by `write_webvtt` back into cue
/// (start, end, text) triples. Only needs to round-trip our own output,
/// not arbitrary VTT.
pub fn parse_webvtt(vtt: &str) -> Vec<(f64, f64, String)> {
    let mut cues = Vec::new();
    let mut lines = vtt.lines().peekable();

    if lines.peek() == Some(&"WEBVTT") {
        lines.next();
    }

    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some((start_str, end_str)) = line.split_once(" --> ") {
            let start = parse_webvtt_time(start_str.trim());
            let end = parse_webvtt_time(end_str.trim());
            let text = lines.next().unwrap_or("").to_string();
            cues.push((start, end, text));
        }
    }

    cues
}

fn parse_webvtt_time(s: &str) -> f64 {
    let (hms, ms) = s.split_once('.').unwrap_or((s, "0"));
    let parts: Vec<&str> = hms.split(':').collect();
    let (h, m, sec) = match parts.as_slice() {
        [h, m, s] => (h.parse().unwrap_or(0.0), m.parse().unwrap_or(0.0), s.parse().unwrap_or(0.0)),
        [m, s] => (0.0, m.parse().unwrap_or(0.0), s.parse().unwrap_or(0.0)),
        _ => (0.0, 0.0, 0.0),
    };
    let millis: f64 = ms.parse().unwrap_or(0.0);
    h * 3600.0 + m * 60.0 + sec + millis / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_webvtt_time_matches_hh_mm_ss_mmm() {
        assert_eq!(format_webvtt_time(0.0), "00:00:00.000");
        assert_eq!(format_webvtt_time(65.5), "00:01:05.500");
        assert_eq!(format_webvtt_time(3661.123), "01:01:01.123");
    }

    #[test]
    fn webvtt_round_trips_through_write_and_parse() {
        let segments = vec![TranscriptSegment {
            start: 0.0,
            end: 5.25,
            text: "Some paragraph text here.".to_string(),
            topic: Some("Technology".to_string()),
            source_ids: vec![],
            words: None,
        }];
        let vtt = write_webvtt(&segments);
        let cues = parse_webvtt(&vtt);
        assert_eq!(cues.len(), 1);
        assert!((cues[0].0 - 0.0).abs() < 1e-6);
        assert!((cues[0].1 - 5.25).abs() < 1e-6);
        assert_eq!(cues[0].2, "Technology");
    }

    #[test]
    fn chapter_falls_back_to_first_50_chars_without_topic() {
        let segments = vec![TranscriptSegment {
            start: 0.0,
            end: 1.0,
            text: "A".repeat(80),
            topic: None,
            source_ids: vec![],
            words: None,
        }];
        let vtt = write_webvtt(&segments);
        let cues = parse_webvtt(&vtt);
        assert_eq!(cues[0].2.len(), CHAPTER_FALLBACK_CHARS);
    }
}
