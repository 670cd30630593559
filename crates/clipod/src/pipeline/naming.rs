//! Clip ids and output file names.

use std::sync::LazyLock;

use regex::Regex;

static RE_UNSAFE_TITLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

const CLIP_ID_LEN: usize = 8;
const CLIP_EXTENSION: &str = "mp4";

/// Short random clip id: the first eight hex characters of a UUID v4.
pub fn short_clip_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(CLIP_ID_LEN);
    id
}

/// Keeps word characters, whitespace and `-`, trims, and turns spaces into
/// underscores.
pub fn safe_title(title: &str) -> String {
    RE_UNSAFE_TITLE_CHARS
        .replace_all(title, "")
        .trim()
        .replace(' ', "_")
}

/// `<clip_id>_<safe title>.mp4`
pub fn clip_file_name(clip_id: &str, title: &str) -> String {
    format!("{}_{}.{}", clip_id, safe_title(title), CLIP_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_clip_id_shape() {
        let id = short_clip_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(short_clip_id(), short_clip_id());
    }

    #[test]
    fn test_safe_title_strips_punctuation() {
        assert_eq!(safe_title("Why Rust? It's fast!"), "Why_Rust_Its_fast");
        assert_eq!(safe_title("  The best-ever moment  "), "The_best-ever_moment");
        assert_eq!(safe_title("../../etc/passwd"), "etcpasswd");
        assert_eq!(safe_title("???"), "");
    }

    #[test]
    fn test_clip_file_name() {
        assert_eq!(
            clip_file_name("1a2b3c4d", "Big reveal: part 2"),
            "1a2b3c4d_Big_reveal_part_2.mp4"
        );
    }
}
