use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::text_utils::normalize;

// A terminator counts when whitespace or the end of the text follows it.
// The trailing whitespace is consumed, which is safe because it can never be
// a terminator itself.
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!](?:\s|$)").expect("valid sentence pattern"));

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub word_count: usize,
    pub character_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub longest_words: Vec<String>,
}

impl TextStats {
    /// Statistics of raw `content`: normalized, then lower-cased.
    pub fn compute(content: &str) -> Self {
        Self::from_normalized(&normalize(content))
    }

    /// Statistics of already normalized text.
    pub fn from_normalized(normalized: &str) -> Self {
        let text = normalized.to_lowercase();
        Self {
            word_count: word_count(&text),
            character_count: character_count(&text),
            sentence_count: sentence_count(&text),
            paragraph_count: paragraph_count(&text),
            longest_words: longest_words(&text),
        }
    }
}

/// Whitespace separated tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Characters other than whitespace.
pub fn character_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// `.`, `?` and `!` followed by whitespace or the end of the text.
///
/// Abbreviations such as "e.g. this" count as sentence ends and an ellipsis
/// before a space counts once.
pub fn sentence_count(text: &str) -> usize {
    SENTENCE_END.find_iter(text).count()
}

/// Non-blank segments separated by one or more blank lines.
pub fn paragraph_count(text: &str) -> usize {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }
    PARAGRAPH_BREAK
        .split(text)
        .filter(|paragraph| !paragraph.trim().is_empty())
        .count()
}

/// Every token of maximal length, in order of appearance, duplicates kept.
pub fn longest_words(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let Some(max) = words.iter().map(|word| word.chars().count()).max() else {
        return Vec::new();
    };
    words
        .into_iter()
        .filter(|word| word.chars().count() == max)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "The quick brown fox jumps over the lazy dog. The lazy dog slept in the sun.";

    #[test]
    fn test_sample_text() {
        let stats = TextStats::compute(SAMPLE);
        assert_eq!(stats.word_count, 16);
        assert_eq!(stats.sentence_count, 2);
        assert_eq!(stats.paragraph_count, 1);
        assert_eq!(stats.longest_words, vec!["quick", "brown", "jumps", "slept"]);
        assert_eq!(stats.character_count, SAMPLE.chars().filter(|c| !c.is_whitespace()).count());
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(word_count(""), 0);
        assert_eq!(character_count(""), 0);
        assert_eq!(sentence_count(""), 0);
        assert_eq!(paragraph_count(""), 0);
        assert!(longest_words("").is_empty());
        assert_eq!(TextStats::compute(""), TextStats::default());
    }

    #[test]
    fn test_whitespace_only_text() {
        assert_eq!(paragraph_count("  \n\n \t "), 0);
        assert_eq!(TextStats::compute(" \r\n\t "), TextStats::default());
    }

    #[test]
    fn test_sentence_count() {
        assert_eq!(sentence_count("Hello! How are you? I am fine."), 3);
        assert_eq!(sentence_count("version 1.2 is out"), 0);
        assert_eq!(sentence_count("wait... what"), 1);
        assert_eq!(sentence_count("first.\nsecond."), 2);
    }

    #[test]
    fn test_paragraph_count() {
        assert_eq!(
            paragraph_count("First paragraph.\n\n\nSecond paragraph.\n\n\nThird paragraph."),
            3
        );
        assert_eq!(paragraph_count("one\ntwo lines, one paragraph"), 1);
        assert_eq!(paragraph_count("a\n  \t\nb"), 2);
    }

    #[test]
    fn test_longest_words_keeps_order_and_duplicates() {
        assert_eq!(longest_words("hello world words"), vec!["hello", "world", "words"]);
        assert_eq!(longest_words("go big or go home big"), vec!["home"]);
        assert_eq!(longest_words("abc de abc"), vec!["abc", "abc"]);
    }

    #[test]
    fn test_character_count_ignores_all_whitespace() {
        assert_eq!(character_count("a b\tc\nd  e"), 5);
        assert_eq!(character_count("héllo wörld"), 10);
    }

    #[test]
    fn test_stats_are_lower_cased() {
        let stats = TextStats::compute("HELLO World");
        assert_eq!(stats.longest_words, vec!["hello", "world"]);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let json = serde_json::to_value(TextStats::compute("Hi there.")).unwrap();
        assert_eq!(json["wordCount"], 2);
        assert_eq!(json["characterCount"], 8);
        assert_eq!(json["sentenceCount"], 1);
        assert_eq!(json["paragraphCount"], 1);
        assert_eq!(json["longestWords"], serde_json::json!(["there."]));
    }

    #[test]
    fn test_longest_words_measure_scalar_values() {
        // Two emoji are two chars, shorter than a three letter word.
        assert_eq!(longest_words("\u{1F600}\u{1F600} abc"), vec!["abc"]);
        assert_eq!(longest_words("\u{e9}t\u{e9} abc"), vec!["\u{e9}t\u{e9}", "abc"]);
    }
}
