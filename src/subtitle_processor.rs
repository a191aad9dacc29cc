use once_cell::sync::Lazy;
use regex::Regex;

use crate::youtube::CaptionEvent;

// @module: Subtitle text formatting and structural parsing

// @const: Purely-numeric sequence line
static SEQUENCE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// One parsed subtitle block: the literal time-range line plus the
/// accumulated text under it. The time line is passed through unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleBlock {
    /// Literal "start --> end" line
    pub time: String,

    /// Space-joined display text
    pub text: String,
}

/// Format a timestamp in milliseconds as SRT time (HH:MM:SS,mmm)
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Convert a position in seconds to an SRT timecode, truncating to whole
/// milliseconds
pub fn seconds_to_timecode(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).floor() as u64;
    format_timestamp(total_ms)
}

/// Render a caption transcript as SRT text
pub fn transcript_to_srt(transcript: &[CaptionEvent]) -> String {
    transcript
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let start = seconds_to_timecode(event.offset);
            let end = seconds_to_timecode(event.offset + event.duration);
            format!("{}\n{} --> {}\n{}\n", index + 1, start, end, event.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Structural parse of an SRT-like payload into translation units.
///
/// A line containing a time-range marker opens a block, following non-blank
/// lines that are not bare sequence numbers accumulate into its text, and a
/// blank line commits it. A block still open when another marker arrives or
/// at end of input is committed as well.
pub fn parse_subtitle_blocks(payload: &str) -> Vec<SubtitleBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<SubtitleBlock> = None;

    for line in payload.lines() {
        if line.contains("-->") {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(SubtitleBlock {
                time: line.to_string(),
                text: String::new(),
            });
        } else if !line.trim().is_empty() {
            if SEQUENCE_LINE_REGEX.is_match(line) {
                continue;
            }
            if let Some(block) = current.as_mut() {
                if !block.text.is_empty() {
                    block.text.push(' ');
                }
                block.text.push_str(line.trim());
            }
        } else if let Some(block) = current.take() {
            blocks.push(block);
        }
    }

    if let Some(block) = current.take() {
        blocks.push(block);
    }

    blocks
}

/// Pair each block's preserved time line with its translated slot, falling
/// back to the original text when the slot is empty
pub fn assemble_translated(blocks: &[SubtitleBlock], translations: &[String]) -> String {
    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            let translated = translations.get(index).map(String::as_str).unwrap_or("");
            let text = if translated.is_empty() {
                block.text.trim()
            } else {
                translated
            };
            format!("{}\n{}\n{}\n", index + 1, block.time, text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
