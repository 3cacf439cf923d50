use crate::models::enums::KnowledgeSource;
use crate::models::{Disease, MedicationAdvice};

const CARE_RECOMMENDATIONS: [&str; 3] = [
    "Hidrátate bien",
    "Descansa lo suficiente",
    "Si los síntomas empeoran, acude al médico",
];

/// Deterministic diagnosis block used whenever the LLM produced nothing.
/// The caller appends the disclaimer.
pub fn render_fallback(disease: &Disease, medication: Option<&MedicationAdvice>) -> String {
    let mut out = format!("**Posible diagnóstico:** {}\n\n", disease.name);

    // Taught diseases only carry a placeholder description.
    if disease.source != KnowledgeSource::Taught {
        if let Some(description) = disease.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            out.push_str(&format!("**Descripción:** {description}\n\n"));
        }
    }

    if let Some(med) = medication {
        out.push_str("**💊 Tratamiento recomendado:**\n");
        out.push_str(&format!("• Medicamento: {}\n", med.name));
        out.push_str(&format!("• Dosis: {}\n", med.dose));
        out.push_str(&format!("• Duración: {}\n\n", med.duration));
    }

    out.push_str("**💡 Recomendaciones:**\n");
    for tip in CARE_RECOMMENDATIONS {
        out.push_str(&format!("• {tip}\n"));
    }
    out.trim_end().to_string()
}

/// Answer to "¿qué puedo tomar para X?".
pub fn render_medication_answer(disease: &str, medication: &MedicationAdvice) -> String {
    format!(
        "**💊 Tratamiento recomendado para {disease}:**\n• Medicamento: {}\n• Dosis: {}\n• Duración: {}",
        medication.name, medication.dose, medication.duration
    )
}
