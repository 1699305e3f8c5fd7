//! Text normalization and extractive summarization.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Sentence separator used by [`summarize`] — a literal period-space.
const SENTENCE_SEP: &str = ". ";

/// Number of sentence fragments kept in a message summary.
pub const SUMMARY_SENTENCES: usize = 2;

/// Lowercase, collapse every whitespace run to one space, trim the ends.
///
/// Pure and total — this is the canonical form every classifier input
/// passes through. Recomputed per call, never cached.
pub fn normalize(raw: &str) -> String {
    WHITESPACE
        .replace_all(&raw.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// First `max_sentences` period-space separated fragments, rejoined.
///
/// Deliberately naive: splits on the literal `". "`, so abbreviations
/// count as sentence ends. Output compatibility depends on this exact
/// behavior — do not replace it with real sentence detection.
pub fn summarize(text: &str, max_sentences: usize) -> String {
    text.split(SENTENCE_SEP)
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(SENTENCE_SEP)
}
