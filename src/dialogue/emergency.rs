use super::normalize;

/// Red-flag phrases (normalized). Any occurrence short-circuits the turn.
pub const RED_FLAGS: &[&str] = &[
    "dolor de pecho",
    "dolor en el pecho",
    "opresion en el pecho",
    "dificultad para respirar",
    "falta de aire",
    "no puedo respirar",
    "sangrado severo",
    "sangrado abundante",
    "hemorragia",
    "confusion mental",
    "confusion",
    "desorientado",
    "desorientada",
    "desorientacion",
    "convulsiones",
    "convulsion",
    "perdida de conciencia",
    "perdi el conocimiento",
    "desmayo",
    "me desmaye",
    "vision borrosa repentina",
    "perdida de vision",
    "paralisis",
    "no puedo mover",
    "entumecimiento severo",
    "dolor abdominal severo",
    "dolor abdominal intenso",
];

pub const EMERGENCY_ALERT: &str = "🚨 **ALERTA DE EMERGENCIA** 🚨

Los síntomas que describes podrían indicar una situación GRAVE que requiere atención médica INMEDIATA.

⚠️ **ACCIONES URGENTES:**
1. Llama al número de emergencias (911 o el de tu país)
2. Acude al hospital más cercano
3. No conduzcas tú mismo si es posible
4. Mantén la calma y explica tus síntomas claramente

**NO ESPERES** - Busca ayuda profesional AHORA.";

/// True when the normalized text contains any red-flag phrase.
pub fn is_emergency(normalized: &str) -> bool {
    RED_FLAGS.iter().any(|flag| normalized.contains(flag))
}

/// Convenience for raw input.
pub fn detect_emergency(raw: &str) -> bool {
    is_emergency(&normalize(raw))
}
