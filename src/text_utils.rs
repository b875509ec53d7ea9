//! Text normalization and content fingerprints.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static INLINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline pattern"));

pub const CACHE_KEY_PREFIX: &str = "text-analysis";

/// Canonical form of `content` used for statistics and cache keys.
///
/// Line endings become `\n`, each line has its whitespace runs collapsed to a
/// single space and is trimmed, runs of three or more newlines become a
/// single blank line, and the whole result is trimmed. Applying it twice
/// yields the same string.
pub fn normalize(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let content = content.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = content
        .split('\n')
        .map(|line| INLINE_WHITESPACE.replace_all(line, " ").trim().to_string())
        .collect();

    // Collapse after trimming lines, otherwise whitespace-only lines could
    // leave three newlines next to each other.
    let joined = lines.join("\n");
    EXCESS_NEWLINES.replace_all(&joined, "\n\n").trim().to_string()
}

/// 128-bit hex digest of the normalized content. Not a security primitive.
pub fn content_hash(content: &str) -> String {
    let normalized = normalize(content);
    if normalized.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(normalized.as_bytes());
    digest[..16].iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Cache key for the stats of `content` as seen by `user_id`.
///
/// Returns an empty string, meaning "do not cache", when either part is empty.
pub fn cache_key(user_id: &str, content: &str) -> String {
    if user_id.is_empty() {
        return String::new();
    }
    let hash = content_hash(content);
    if hash.is_empty() {
        return String::new();
    }
    format!("{}:{}:{}", CACHE_KEY_PREFIX, user_id, hash)
}

/// Whether `content` differs, after normalization, from what `previous_hash`
/// was computed over.
pub fn has_content_changed(previous_hash: &str, content: &str) -> bool {
    content_hash(content) != previous_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_line_endings() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapses_paragraph_breaks() {
        assert_eq!(normalize("one\n\n\n\n\ntwo"), "one\n\ntwo");
        assert_eq!(normalize("one\n\ntwo"), "one\n\ntwo");
    }

    #[test]
    fn test_collapses_inline_whitespace_and_trims_lines() {
        assert_eq!(
            normalize("  hello    big \t world  \n  next  line "),
            "hello big world\nnext line"
        );
    }

    #[test]
    fn test_whitespace_only_lines_do_not_leave_extra_breaks() {
        let normalized = normalize("a\n\n   \n\nb");
        assert_eq!(normalized, "a\n\nb");
        assert_eq!(normalize(&normalized), normalized);
    }

    #[test]
    fn test_normalize_empty_and_blank() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t\r\n "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "The quick brown fox.\r\n\r\n\r\n  Jumps   over\t\tthe dog.  ",
            "\n\n\nleading breaks",
            "tab\tseparated\ttext",
            " \u{a0}\u{a0}unicode  spaces\u{2003} ",
            "a\n \n \n \nb\n\n\n\nc",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_content_hash_is_stable_and_normalized() {
        let hash = content_hash("hello world");
        assert_eq!(hash.len(), 32);
        assert_eq!(hash, content_hash("  hello    world \r\n"));
        assert_ne!(hash, content_hash("hello worlds"));
        assert_eq!(content_hash("   "), "");
    }

    #[test]
    fn test_cache_key() {
        let key = cache_key("user-1", "hello world");
        assert_eq!(key, format!("text-analysis:user-1:{}", content_hash("hello world")));
        assert_eq!(cache_key("user-1", "hello   world"), key);
        assert_ne!(cache_key("user-2", "hello world"), key);
        assert_eq!(cache_key("", "hello world"), "");
        assert_eq!(cache_key("user-1", ""), "");
    }

    #[test]
    fn test_change_detection() {
        let hash = content_hash("First draft.");
        assert!(!has_content_changed(&hash, "First   draft."));
        assert!(has_content_changed(&hash, "Second draft."));
    }
}
