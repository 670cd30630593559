//! SubRip windowing: cut the cues of one clip out of a full transcript.

use std::sync::LazyLock;

use regex::Regex;

static RE_CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+):(\d+):(\d+),(\d+)\s*-->\s*(\d+):(\d+):(\d+),(\d+)").unwrap()
});
static RE_BLOCK_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Formats seconds as an SRT timestamp, `HH:MM:SS,mmm`.
pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

fn timing_seconds(caps: &regex::Captures<'_>, first_group: usize) -> f64 {
    let field = |i: usize| {
        caps.get(first_group + i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0) as f64
    };
    field(0) * 3600.0 + field(1) * 60.0 + field(2) + field(3) / 1000.0
}

/// Returns the cues overlapping `[start, end]`, shifted so the clip starts at
/// zero and clamped to the clip length. Cues are renumbered from 1.
///
/// Blocks without a timing line, or with fewer than three lines, are skipped.
pub fn extract_segment(srt: &str, start: f64, end: f64) -> String {
    let normalized = srt.replace("\r\n", "\n");
    let clip_length = end - start;
    let mut blocks = Vec::new();

    for block in RE_BLOCK_SEPARATOR.split(normalized.trim()) {
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < 3 {
            continue;
        }
        let Some(caps) = RE_CUE_TIMING.captures(lines[1]) else {
            continue;
        };

        let cue_start = timing_seconds(&caps, 1);
        let cue_end = timing_seconds(&caps, 5);
        if cue_end < start || cue_start > end {
            continue;
        }

        let shifted_start = (cue_start - start).max(0.0);
        let shifted_end = (cue_end - start).min(clip_length);

        blocks.push(format!(
            "{}\n{} --> {}\n{}",
            blocks.len() + 1,
            format_srt_time(shifted_start),
            format_srt_time(shifted_end),
            lines[2..].join("\n")
        ));
    }

    blocks.join("\n\n")
}
