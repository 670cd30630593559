//! Parsing of the analyze step's reply into clip ranges.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static RE_FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[a-zA-Z]*\s*").unwrap());
static RE_FENCE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```$").unwrap());

/// A segment of the source video worth turning into a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub title: String,
    pub description: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl Highlight {
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

#[derive(Debug, Deserialize)]
struct RawHighlight {
    start_time: Value,
    end_time: Value,
    title: String,
    #[serde(default)]
    description: String,
}

/// Converts `HH:MM:SS`, `MM:SS` (seconds may carry `.fff` or `,fff`) or a
/// plain number of seconds. Returns `None` when the text is not a timecode.
pub fn parse_timecode(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    let seconds = match parts.as_slice() {
        [hours, minutes, seconds] => {
            hours.parse::<u64>().ok()? as f64 * 3600.0
                + minutes.parse::<u64>().ok()? as f64 * 60.0
                + seconds.parse::<f64>().ok()?
        }
        [minutes, seconds] => {
            minutes.parse::<u64>().ok()? as f64 * 60.0 + seconds.parse::<f64>().ok()?
        }
        [seconds] => seconds.parse::<f64>().ok()?,
        _ => return None,
    };

    seconds.is_finite().then_some(seconds)
}

fn timecode_value(value: &Value, title: &str) -> f64 {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_timecode(s),
        _ => None,
    };
    seconds.unwrap_or_else(|| {
        tracing::warn!(title = %title, value = %value, "Unreadable timecode, using 0");
        0.0
    })
}

/// Removes a surrounding markdown code fence, if any.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let start = RE_FENCE_OPEN.find(trimmed).map_or(0, |m| m.end());
    let body = &trimmed[start..];
    match RE_FENCE_CLOSE.find(body) {
        Some(m) => &body[..m.start()],
        None => body,
    }
}

/// Parses the analyze step's reply.
///
/// Highlights whose end is not after their start are dropped.
pub fn parse_highlights(reply: &str) -> Result<Vec<Highlight>, serde_json::Error> {
    let raw: Vec<RawHighlight> = serde_json::from_str(strip_code_fence(reply))?;

    let highlights = raw
        .into_iter()
        .filter_map(|raw| {
            let highlight = Highlight {
                start_seconds: timecode_value(&raw.start_time, &raw.title),
                end_seconds: timecode_value(&raw.end_time, &raw.title),
                title: raw.title,
                description: raw.description,
            };
            if highlight.duration() > 0.0 {
                Some(highlight)
            } else {
                tracing::warn!(
                    title = %highlight.title,
                    start = highlight.start_seconds,
                    end = highlight.end_seconds,
                    "Dropping highlight with empty time range"
                );
                None
            }
        })
        .collect();

    Ok(highlights)
}
