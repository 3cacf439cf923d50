//! Intent detection that runs before symptom extraction: conversational
//! shortcuts, medication questions and encyclopedia questions.

use std::sync::LazyLock;

use regex::Regex;

use super::extraction::{contains_phrase, has_local_symptom};

/// Short messages only; longer ones are treated as complaints.
const MAX_SHORTCUT_WORDS: usize = 4;

const GREETINGS: &[&str] = &["hola", "buenos dias", "buenas tardes", "buenas noches", "buen dia"];
const GRATITUDE: &[&str] = &["gracias", "muchas gracias", "te lo agradezco"];
const FAREWELLS: &[&str] = &["adios", "hasta luego", "hasta pronto", "nos vemos", "chao", "chau"];

/// Phrases announcing recovery (normalized).
const IMPROVEMENT: &[&str] = &[
    "me siento bien",
    "ya estoy mejor",
    "estoy bien",
    "mejore",
    "ya me siento mejor",
    "me encuentro mejor",
    "ya me recupere",
    "estoy recuperado",
    "estoy recuperada",
    "todo bien",
    "ya paso",
    "ya no tengo nada",
    "ya no me duele",
    "ya me siento normal",
    "ya no tengo sintomas",
    "ya todo esta bien",
    "ya estoy como nuevo",
    "ya estoy como nueva",
    "ya me cure",
    "ya me alivio",
    "ya se me paso",
    "ya no tengo molestias",
    "estoy mucho mejor",
    "ya me sane",
    "ya no me molesta",
    "todo tranquilo",
    "ya estoy al 100",
    "ya me repuse",
    "ya estoy al cien",
    "estoy estable",
    "todo en orden",
    "ya estoy ok",
];

pub const GREETING_REPLY: &str = "¡Hola! ¿Cómo te sientes hoy? 😊";
pub const GRATITUDE_REPLY: &str = "¡De nada! 😊 Si necesitas algo más, aquí estaré.";
pub const IMPROVEMENT_REPLY: &str = "¡Qué buena noticia! Me alegra que te sientas mejor 😊";
pub const FAREWELL_REPLY: &str = "¡Cuídate mucho! Si vuelves a sentirte mal, aquí estaré. 👋";

static MEDICATION_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(que puedo tomar|que medicamento|que medicina|cual es el tratamiento)\b")
        .expect("Invalid intent regex")
});

static INFO_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[¿¡\s]*(que|cuales|explica|explicame|hablame)\b.*\b(es|son|sobre)\b")
        .expect("Invalid intent regex")
});

static DISEASE_AFTER_PARA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bpara\s+(?:la\s+|el\s+|los\s+|las\s+)?(.+)$").expect("Invalid intent regex")
});

/// Topic patterns on lower-cased raw text, most specific first.
static TOPIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"cu[aá]les son los s[ií]ntomas de(?:l)?\s+(?:la\s+|el\s+|los\s+|las\s+)?(.+)$",
        r"\bsobre\s+(?:la\s+|el\s+|los\s+|las\s+)?(.+)$",
        r"\bqu[eé]\s+(?:es|son)\s+(?:la\s+|el\s+|los\s+|las\s+|un\s+|una\s+)?(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid topic regex"))
    .collect()
});

/// Conversational message that short-circuits the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Greeting,
    Gratitude,
    Improvement,
    Farewell,
}

/// Detect a shortcut in normalized text.
///
/// Recovery phrases always count unless negated ("no me siento bien").
/// Greetings, thanks and farewells only count in short messages that
/// mention no symptom, so "hola, tengo tos" is still a complaint.
pub fn detect_shortcut(normalized: &str) -> Option<Shortcut> {
    if IMPROVEMENT.iter().any(|p| contains_affirmed(normalized, p)) {
        return Some(Shortcut::Improvement);
    }

    let words = normalized.split_whitespace().count();
    if words > MAX_SHORTCUT_WORDS || has_local_symptom(normalized) {
        return None;
    }

    let any = |phrases: &[&str]| phrases.iter().any(|p| contains_phrase(normalized, p));
    if any(GREETINGS) {
        Some(Shortcut::Greeting)
    } else if any(GRATITUDE) {
        Some(Shortcut::Gratitude)
    } else if any(FAREWELLS) {
        Some(Shortcut::Farewell)
    } else {
        None
    }
}

/// Whole-word occurrence not immediately preceded by "no".
fn contains_affirmed(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, _)| {
        let preceding = text[..start].trim_end();
        let negated = preceding == "no" || preceding.ends_with(" no");
        !negated && boundary_at(text, start, phrase.len())
    })
}

fn boundary_at(text: &str, start: usize, len: usize) -> bool {
    let before = text[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
    let after = text[start + len..].chars().next().map_or(true, |c| !c.is_alphanumeric());
    before && after
}

pub fn is_medication_question(normalized: &str) -> bool {
    MEDICATION_QUESTION.is_match(normalized)
}

pub fn is_info_question(normalized: &str) -> bool {
    INFO_QUESTION.is_match(normalized)
}

/// Disease named after "para" ("¿qué puedo tomar para la migraña?" → "migraña").
pub fn disease_after_para(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    DISEASE_AFTER_PARA
        .captures(&lower)
        .map(|caps| clean_topic(&caps[1]))
        .filter(|t| !t.is_empty() && !is_pronoun(t))
}

/// Topic of an explanatory question, keeping accents for display and lookup.
pub fn extract_topic(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    TOPIC_PATTERNS
        .iter()
        .find_map(|re| re.captures(&lower).map(|caps| clean_topic(&caps[1])))
        .filter(|t| !t.is_empty() && !is_pronoun(t))
}

fn clean_topic(text: &str) -> String {
    text.trim()
        .trim_end_matches(['?', '!', '.', ',', ';', ':'])
        .trim()
        .to_string()
}

fn is_pronoun(topic: &str) -> bool {
    matches!(topic, "que" | "qué" | "cuales" | "cuáles" | "eso" | "esto")
}
