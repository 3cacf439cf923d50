//! Parsing for the two-step disease/medication teaching interview.

/// Weight of the rule created when a reported phrase is learned as a symptom.
pub const LEARNED_RULE_WEIGHT: f64 = 0.6;

/// Stored as the description of diseases taught by users.
pub const TAUGHT_DISEASE_DESCRIPTION: &str = "Enfermedad aprendida por retroalimentación.";
pub const TAUGHT_MEDICATION_DESCRIPTION: &str = "Aprendido del usuario";

pub const ASK_DISEASE: &str =
    "Hmm, no reconozco ese síntoma... ¿Te diagnosticaron alguna enfermedad relacionada? Puedo aprender de ello. 😊";
pub const ASK_MEDICATION: &str =
    "¡Gracias! ¿Recuerdas qué medicamento usaste y cómo? Formato: nombre, dosis, frecuencia, duración. 🙏";
pub const MEDICATION_FORMAT_REPROMPT: &str =
    "Por favor, indica el medicamento en el formato correcto: nombre, dosis, frecuencia, duración.";
pub const DISEASE_NAME_REPROMPT: &str =
    "No entendí el nombre de la enfermedad. ¿Podrías escribirlo de nuevo?";

/// A `name, dose, frequency, duration` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationDetails {
    pub name: String,
    /// Dose and frequency joined, as stored.
    pub dosage: String,
    pub duration: String,
}

/// Trim and capitalize (first letter upper, rest lower).
pub fn capitalize(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Disease name from a free-text answer, `None` when blank.
pub fn parse_disease_name(raw: &str) -> Option<String> {
    let name = capitalize(raw.trim().trim_end_matches(['.', '!', '?']));
    (!name.is_empty()).then_some(name)
}

/// Parse `name, dose, frequency, duration`; `None` with fewer than four fields
/// or an empty name. Extra fields are ignored.
pub fn parse_medication_details(raw: &str) -> Option<MedicationDetails> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() < 4 || parts[0].is_empty() {
        return None;
    }
    Some(MedicationDetails {
        name: capitalize(parts[0]),
        dosage: format!("{} {}", parts[1], parts[2]).trim().to_string(),
        duration: parts[3].to_string(),
    })
}

pub fn learned_message(disease: &str, details: &MedicationDetails) -> String {
    format!(
        "¡Genial! He aprendido que para *{disease}* se puede recomendar **{}** ({}, {}). 🧠💊",
        details.name, details.dosage, details.duration
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_lowers_the_rest() {
        assert_eq!(capitalize("  GRIPE aviar "), "Gripe aviar");
        assert_eq!(capitalize("ébola"), "Ébola");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn disease_name_strips_trailing_punctuation() {
        assert_eq!(parse_disease_name("varicela."), Some("Varicela".into()));
        assert_eq!(parse_disease_name("   "), None);
    }

    #[test]
    fn three_fields_are_rejected() {
        assert_eq!(parse_medication_details("ibuprofeno, 400 mg, cada 8 horas"), None);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(parse_medication_details(", 400 mg, cada 8 horas, 3 dias"), None);
    }

    #[test]
    fn four_fields_merge_dose_and_frequency() {
        let details = parse_medication_details("ibuprofeno, 400 mg, cada 8 horas, 3 días").unwrap();
        assert_eq!(
            details,
            MedicationDetails {
                name: "Ibuprofeno".into(),
                dosage: "400 mg cada 8 horas".into(),
                duration: "3 días".into(),
            }
        );
    }

    #[test]
    fn blank_frequency_does_not_leave_trailing_space() {
        let details = parse_medication_details("calamina, 1 aplicación, , 7 días").unwrap();
        assert_eq!(details.dosage, "1 aplicación");
    }

    #[test]
    fn learned_message_mentions_everything() {
        let details = parse_medication_details("calamina, 1 aplicación, cada 8 horas, 7 días").unwrap();
        let msg = learned_message("Varicela", &details);
        assert!(msg.contains("*Varicela*"));
        assert!(msg.contains("**Calamina**"));
        assert!(msg.contains("(1 aplicación cada 8 horas, 7 días)"));
    }
}
