use std::sync::LazyLock;

use regex::Regex;

use super::normalize;
use crate::models::enums::Emotion;

/// Detected emotion and its intensity (1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmotionReading {
    pub emotion: Option<Emotion>,
    pub intensity: u8,
}

struct EmotionBucket {
    emotion: Emotion,
    patterns: Vec<Regex>,
}

/// Buckets in priority order; the first bucket with a matching pattern wins.
static BUCKETS: LazyLock<Vec<EmotionBucket>> = LazyLock::new(|| {
    vec![
        bucket(
            Emotion::AcutePain,
            &[r"\bdolor (fuerte|intenso|agudo)\b", r"\binsoportable\b"],
        ),
        bucket(
            Emotion::Anxiety,
            &[r"\bpreocupad[oa]\b", r"\bansiedad\b", r"\bme da miedo\b"],
        ),
        bucket(
            Emotion::Malaise,
            &[r"\bme siento mal\b", r"\bmalestar\b", r"\bmal\b", r"\bnauseas?\b", r"\bmareos?\b"],
        ),
        bucket(
            Emotion::Relief,
            &[r"\bmejor\b", r"\bme siento mejor\b", r"\bgracias,?\s*me ayudo\b"],
        ),
    ]
});

static INTENSIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(mucho|demasiado|terrible|horrible|insoportable)\b")
        .expect("Invalid intensifier regex")
});

fn bucket(emotion: Emotion, patterns: &[&str]) -> EmotionBucket {
    EmotionBucket {
        emotion,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).expect("Invalid emotion regex"))
            .collect(),
    }
}

/// Classify the emotional tone of a raw message.
///
/// Exclamation marks are counted on the raw text; patterns run on the
/// normalized text.
pub fn detect_emotion(raw: &str) -> EmotionReading {
    let normalized = normalize(raw);
    let emotion = BUCKETS
        .iter()
        .find(|b| b.patterns.iter().any(|p| p.is_match(&normalized)))
        .map(|b| b.emotion);

    let exclaimed = raw.matches('!').count() >= 2;
    let intensified = INTENSIFIER.is_match(&normalized);
    let intensity = (1 + u8::from(exclaimed) + u8::from(intensified)).clamp(1, 3);

    EmotionReading { emotion, intensity }
}

/// Empathetic opening sentence for an emotion at a given intensity.
pub fn empathetic_preface(emotion: Option<Emotion>, intensity: u8) -> &'static str {
    let [low, mid, high] = match emotion {
        Some(Emotion::AcutePain) => [
            "Entiendo que hay dolor. Te acompaño.",
            "Siento que el dolor es fuerte. Vamos a actuar con señales de alerta.",
            "Tu dolor suena intenso. Si hay falta de aire o dolor en el pecho, busca atención ya. Te guío con pasos claros.",
        ],
        Some(Emotion::Anxiety) => [
            "Gracias por compartir cómo te sientes. Vamos paso a paso.",
            "Veo ansiedad. Te doy recomendaciones concretas.",
            "Suena abrumador. Estoy aquí para ayudarte con acciones simples.",
        ],
        Some(Emotion::Malaise) => [
            "Gracias por describirlo. Revisemos síntomas y opciones.",
            "Tomé nota del malestar. Te doy recomendaciones y señales de alerta.",
            "Entiendo que se siente fuerte. Te ofrezco pasos claros y cuándo buscar ayuda.",
        ],
        Some(Emotion::Relief) => [
            "¡Qué bien! Te dejo indicaciones para mantener la mejora.",
            "Buen progreso. Consolidemos con hábitos sencillos.",
            "Excelente avance. Cierro con un plan breve de prevención.",
        ],
        None => [
            "Te ayudo con gusto.",
            "Te lo explico de forma clara y directa.",
            "Resumiré lo crítico y luego ampliamos.",
        ],
    };
    match intensity.clamp(1, 3) {
        1 => low,
        2 => mid,
        _ => high,
    }
}

impl EmotionReading {
    pub fn preface(&self) -> &'static str {
        empathetic_preface(self.emotion, self.intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acute_pain_outranks_malaise() {
        let reading = detect_emotion("Me siento mal, tengo un dolor intenso");
        assert_eq!(reading.emotion, Some(Emotion::AcutePain));
    }

    #[test]
    fn anxiety_outranks_relief() {
        let reading = detect_emotion("Estoy mejor pero preocupada");
        assert_eq!(reading.emotion, Some(Emotion::Anxiety));
    }

    #[test]
    fn accents_are_ignored() {
        assert_eq!(detect_emotion("Tengo NÁUSEAS").emotion, Some(Emotion::Malaise));
    }

    #[test]
    fn neutral_text_has_no_emotion() {
        let reading = detect_emotion("tengo tos");
        assert_eq!(reading, EmotionReading { emotion: None, intensity: 1 });
        assert_eq!(reading.preface(), "Te ayudo con gusto.");
    }

    #[test]
    fn intensity_adds_exclamations_and_intensifiers() {
        assert_eq!(detect_emotion("me duele!!").intensity, 2);
        assert_eq!(detect_emotion("me duele mucho").intensity, 2);
        assert_eq!(detect_emotion("¡¡me duele muchísimo!! es horrible!!!").intensity, 3);
        assert_eq!(detect_emotion("me duele!").intensity, 1);
    }

    #[test]
    fn preface_clamps_intensity() {
        assert_eq!(
            empathetic_preface(Some(Emotion::Relief), 9),
            "Excelente avance. Cierro con un plan breve de prevención."
        );
        assert_eq!(
            empathetic_preface(Some(Emotion::Malaise), 0),
            "Gracias por describirlo. Revisemos síntomas y opciones."
        );
    }
}
