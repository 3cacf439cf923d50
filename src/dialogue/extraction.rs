use std::sync::LazyLock;

use regex::Regex;

use crate::knowledge::KnowledgeBase;

/// Accepted body-temperature range in °C; readings outside it are ignored.
pub const MIN_TEMPERATURE_C: f64 = 35.0;
pub const MAX_TEMPERATURE_C: f64 = 43.0;
pub const FEVER_THRESHOLD_C: f64 = 38.0;
pub const HIGH_FEVER_THRESHOLD_C: f64 = 39.5;

pub const FEVER: &str = "fiebre";
pub const HIGH_FEVER: &str = "fiebre alta";

/// Number followed by a unit or context cue ("38.5 grados", "39°", "40 de fiebre").
static TEMPERATURE_WITH_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2}(?:[.,]\d+)?)\s*(?:°|º|grados|celsius|c\b|de temperatura|de fiebre|fiebre)")
        .expect("Invalid temperature regex")
});

/// Cue followed by a number ("fiebre de 39", "temperatura 38,2").
static CUE_WITH_TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:fiebre|temperatura)\s+(?:de\s+)?(\d{2}(?:[.,]\d+)?)\b")
        .expect("Invalid temperature regex")
});

/// Any plausible reading, used when the question already asked for a temperature.
static BARE_TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2}(?:[.,]\d+)?)\b").expect("Invalid temperature regex")
});

/// Local phrase → canonical symptom table, checked in order. Phrases are normalized.
const LOCAL_PHRASES: &[(&str, &[&str])] = &[
    ("dolor de cabeza", &["dolor de cabeza", "me duele la cabeza", "dolores de cabeza"]),
    (HIGH_FEVER, &["fiebre alta", "fiebre muy alta"]),
    (FEVER, &["fiebre", "temperatura alta", "calentura"]),
    ("gripe", &["gripe", "sintomas de la gripe"]),
    ("tos", &["tos", "estoy tosiendo"]),
    ("dolor de garganta", &["dolor de garganta", "me duele la garganta", "garganta inflamada"]),
    ("congestion nasal", &["nariz tapada", "congestion nasal", "nariz congestionada"]),
    ("dolor abdominal", &["dolor abdominal", "me duele el estomago", "dolor de barriga", "me duele la barriga"]),
    ("nauseas", &["nauseas", "nausea", "ganas de vomitar"]),
    ("vomitos", &["vomitos", "vomito"]),
    ("diarrea", &["diarrea"]),
    ("mareos", &["mareos", "mareo", "me siento mareado", "me siento mareada"]),
    ("fatiga", &["cansancio", "fatiga", "cansado", "cansada"]),
    ("escalofrios", &["escalofrios"]),
    ("dolor lumbar", &["dolor en la espalda baja", "dolor lumbar", "me duele la espalda baja"]),
    ("picor en los ojos", &["me pican los ojos", "picazon en los ojos", "picor en los ojos"]),
    ("dolor en el pecho", &["dolor en el pecho", "dolor de pecho"]),
    ("estornudos", &["estornudos", "estornudando"]),
    ("dolor muscular", &["dolor muscular", "dolores musculares"]),
];

/// Symptoms and temperature found in one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Canonical labels, duplicate-free, in first-seen order.
    pub symptoms: Vec<String>,
    pub temperature: Option<f64>,
}

/// Extract canonical symptoms from already-normalized text.
///
/// Synonym lookup failures are logged and skipped; local matches still count.
pub fn extract_symptoms(normalized: &str, kb: &dyn KnowledgeBase) -> Extraction {
    let mut symptoms: Vec<String> = Vec::new();

    let temperature = parse_temperature(normalized);
    if let Some(tag) = temperature.and_then(fever_tag) {
        symptoms.push(tag.to_string());
    }

    for (canonical, phrases) in LOCAL_PHRASES {
        if phrases.iter().any(|p| contains_phrase(normalized, p)) {
            symptoms.push(canonical.to_string());
        }
    }

    match kb.lookup_symptom_synonyms(normalized) {
        Ok(found) => symptoms.extend(found),
        Err(e) => tracing::warn!(error = %e, "Synonym lookup failed, using local patterns only"),
    }

    Extraction {
        symptoms: finalize_symptoms(symptoms),
        temperature,
    }
}

/// True when any local symptom phrase occurs in the normalized text.
pub fn has_local_symptom(normalized: &str) -> bool {
    LOCAL_PHRASES
        .iter()
        .any(|(_, phrases)| phrases.iter().any(|p| contains_phrase(normalized, p)))
}

/// De-duplicate preserving first-seen order; "fiebre alta" supersedes "fiebre".
pub fn finalize_symptoms(symptoms: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(symptoms.len());
    for s in symptoms {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    if out.iter().any(|s| s == HIGH_FEVER) {
        out.retain(|s| s != FEVER);
    }
    out
}

/// Temperature stated with a cue, if within the accepted range.
pub fn parse_temperature(normalized: &str) -> Option<f64> {
    TEMPERATURE_WITH_CUE
        .captures(normalized)
        .or_else(|| CUE_WITH_TEMPERATURE.captures(normalized))
        .and_then(|caps| parse_reading(&caps[1]))
}

/// First plausible temperature reading without requiring a cue.
pub fn parse_bare_temperature(normalized: &str) -> Option<f64> {
    BARE_TEMPERATURE
        .captures_iter(normalized)
        .find_map(|caps| parse_reading(&caps[1]))
}

fn parse_reading(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|t| (MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(t))
}

/// Symptom implied by a temperature reading.
pub fn fever_tag(temperature: f64) -> Option<&'static str> {
    if temperature >= HIGH_FEVER_THRESHOLD_C {
        Some(HIGH_FEVER)
    } else if temperature >= FEVER_THRESHOLD_C {
        Some(FEVER)
    } else {
        None
    }
}

/// `phrase` occurs in `text` delimited by non-alphanumeric characters.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before_ok = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
