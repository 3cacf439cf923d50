use std::sync::LazyLock;

use regex::Regex;

use crate::dialogue::normalize;

/// Sentences kept from a summary.
pub const MAX_SUMMARY_SENTENCES: usize = 2;
const MIN_SENTENCE_WORDS: usize = 6;

static REFERENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\d+\]|\[nota \d+\]").expect("Invalid summary regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid summary regex"));
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s+").expect("Invalid summary regex"));
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}").expect("Invalid summary regex"));

const SKIPPED_PREFIXES: &[&str] = &["véase", "vease", "puede referirse a"];

const MEDICAL_KEYWORDS: &[&str] = &[
    "sintoma",
    "infeccion",
    "provoca",
    "produce",
    "caracteriza",
    "afecta",
    "causa",
    "dolor",
    "tos",
    "fiebre",
    "fatiga",
    "nauseas",
    "sindrome",
    "enfermedad",
    "virus",
    "trastorno",
];

/// Reduce an encyclopedia summary to at most two informative sentences.
///
/// A sentence is kept when it has at least six words, is not a
/// cross-reference, mentions no four-digit year and contains a medical
/// keyword. Returns `None` when nothing survives.
pub fn clean_summary(text: &str) -> Option<String> {
    let text = REFERENCE_MARKER.replace_all(text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = text.trim();

    let pieces: Vec<&str> = SENTENCE_END.split(text).collect();
    let last = pieces.len().saturating_sub(1);

    let kept: Vec<String> = pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let piece = piece.trim();
            if i < last {
                format!("{piece}.")
            } else {
                piece.to_string()
            }
        })
        .filter(|sentence| is_informative(sentence))
        .take(MAX_SUMMARY_SENTENCES)
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}

fn is_informative(sentence: &str) -> bool {
    if sentence.split_whitespace().count() < MIN_SENTENCE_WORDS {
        return false;
    }
    let lower = sentence.to_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return false;
    }
    if YEAR.is_match(sentence) {
        return false;
    }
    let normalized = normalize(sentence);
    MEDICAL_KEYWORDS.iter().any(|k| normalized.contains(k))
}
