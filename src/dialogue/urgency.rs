use super::emergency::EMERGENCY_ALERT;
use super::extraction::{FEVER_THRESHOLD_C, HIGH_FEVER_THRESHOLD_C};
use crate::models::enums::UrgencyLevel;

/// Symptom keywords that raise urgency to `alto`.
const HIGH_RISK_KEYWORDS: &[&str] = &[
    "dolor abdominal",
    "vomitos persistentes",
    "diarrea severa",
    "dolor intenso",
    "fiebre alta",
    "rigidez de cuello",
];

/// Symptom count from which urgency is at least `medio`.
const MEDIUM_SYMPTOM_COUNT: usize = 3;

/// Urgency of a non-emergency turn from its symptoms and temperature.
pub fn assess(symptoms: &[String], temperature: Option<f64>) -> UrgencyLevel {
    if temperature.is_some_and(|t| t >= HIGH_FEVER_THRESHOLD_C) {
        return UrgencyLevel::High;
    }

    let joined = symptoms.join(" ");
    if HIGH_RISK_KEYWORDS.iter().any(|k| joined.contains(k)) {
        return UrgencyLevel::High;
    }

    if temperature.is_some_and(|t| t >= FEVER_THRESHOLD_C) || symptoms.len() >= MEDIUM_SYMPTOM_COUNT {
        return UrgencyLevel::Medium;
    }

    UrgencyLevel::Low
}

/// Append the urgency-scaled medical disclaimer.
pub fn with_disclaimer(response: &str, urgency: UrgencyLevel) -> String {
    let note = match urgency {
        UrgencyLevel::Emergency => return format!("{EMERGENCY_ALERT}\n\n{response}"),
        UrgencyLevel::High => "Esta evaluación es preliminar. Tus síntomas requieren **consulta médica pronto**. No sustituye diagnóstico profesional.",
        UrgencyLevel::Medium => "Esta es una orientación general. Si los síntomas persisten o empeoran, consulta a un médico.",
        UrgencyLevel::Low => "Esta información es orientativa y NO reemplaza una consulta médica profesional.",
    };
    format!("{response}\n\n---\n\n⚠️ **RECORDATORIO IMPORTANTE:** {note}")
}
