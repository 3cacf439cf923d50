use crate::models::enums::MessageRole;
use crate::models::Message;

use super::triage::TriageAnswers;

pub const TRIAGE_SYSTEM_PROMPT: &str = r#"Eres un asistente médico virtual de orientación. NO eres un médico y no reemplazas una consulta profesional.

REGLAS:
1. Lee TODO el historial antes de responder.
2. Si ya diste un diagnóstico orientativo, menciónalo en lugar de empezar de cero.
3. Si el usuario pregunta por alternativas, compáralas con la recomendación original.
4. En preguntas de seguimiento responde directamente, en máximo 4 líneas.
5. No pidas información que el usuario ya dio.
6. Los medicamentos siempre con dosis y duración concretas.
7. Si aparecen señales de alarma, indica buscar atención médica inmediata.

FORMATO PARA UN DIAGNÓSTICO INICIAL:
**Posible diagnóstico:** [Nombre]
**Descripción:** [1-2 líneas]
**Tratamiento:**
• Medicamento: [Nombre]
• Dosis: [Ej: "400 mg cada 8 horas"]
• Duración: [Ej: "3-5 días"]
**Recomendaciones:**
• [Punto 1]
• [Punto 2]

Responde en español, con tono profesional pero cercano."#;

/// Everything the LLM sees about the current turn.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    pub message: &'a str,
    /// Prior messages, oldest first, excluding `message`.
    pub history: &'a [Message],
    pub symptoms: &'a [String],
    pub temperature: Option<f64>,
    /// Disease picked by the rule scorer this turn.
    pub diagnosis: Option<&'a str>,
    /// Diagnosis established in an earlier turn.
    pub previous_diagnosis: Option<&'a str>,
    pub triage: Option<&'a TriageAnswers>,
}

/// Build the user prompt. Only the last `history_window` messages are included.
pub fn build_prompt(ctx: &PromptContext<'_>, history_window: usize) -> String {
    let mut prompt = String::new();

    prompt.push_str("MENSAJE NUEVO DEL USUARIO:\n");
    prompt.push_str(ctx.message);
    prompt.push_str("\n\n");

    let skip = ctx.history.len().saturating_sub(history_window);
    let recent = &ctx.history[skip..];
    if !recent.is_empty() {
        prompt.push_str("<CONVERSACION_PREVIA>\n");
        for (i, msg) in recent.iter().enumerate() {
            let role = match msg.role {
                MessageRole::User => "USUARIO",
                MessageRole::Assistant => "ASISTENTE",
            };
            prompt.push_str(&format!("[{}] {}: {}\n", i + 1, role, msg.content));
        }
        prompt.push_str("</CONVERSACION_PREVIA>\n\n");
    }

    prompt.push_str("CONTEXTO CLÍNICO:\n");
    if ctx.symptoms.is_empty() {
        prompt.push_str("- Síntomas detectados: Ninguno detectado en este mensaje\n");
    } else {
        prompt.push_str(&format!("- Síntomas detectados: {}\n", ctx.symptoms.join(", ")));
    }
    match ctx.temperature {
        Some(t) => prompt.push_str(&format!("- Temperatura: {t:.1}°C\n")),
        None => prompt.push_str("- Temperatura: No reportada\n"),
    }
    if let Some(diagnosis) = ctx.diagnosis {
        prompt.push_str(&format!("- Diagnóstico según reglas: {diagnosis}\n"));
    }
    if let Some(previous) = ctx.previous_diagnosis {
        prompt.push_str(&format!("- Diagnóstico preliminar previo: {previous}\n"));
    }

    if let Some(answers) = ctx.triage {
        prompt.push_str("\nINFORMACIÓN DEL TRIAJE:\n");
        match answers.severity {
            Some(s) => prompt.push_str(&format!("- Intensidad del malestar: {s}/10\n")),
            None => prompt.push_str("- Intensidad del malestar: No especificada\n"),
        }
        prompt.push_str(&format!(
            "- Duración: {}\n",
            answers.duration.as_deref().unwrap_or("No especificada")
        ));
        let flags = answers.reported_flags();
        if !flags.is_empty() {
            prompt.push_str(&format!("- Otros síntomas: {}\n", flags.join(", ")));
        }
    }

    prompt
}
