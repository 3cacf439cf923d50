//! Turn processing: routes one user message through emergency detection,
//! shortcuts, triage, teaching, intent answers and diagnosis, then persists
//! the exchange.
//!
//! A turn works on a copy of the user's context and commits it only when the
//! turn completes, so a failed or panicked turn leaves the previous state
//! untouched.

use std::panic::{self, AssertUnwindSafe};

use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::conversation::{symptom_title, ConversationLog};
use crate::encyclopedia::{clean_summary, Encyclopedia, EncyclopediaEntry};
use crate::knowledge::KnowledgeBase;
use crate::llm::LlmGenerate;
use crate::models::enums::{Emotion, KnowledgeSource, MessageRole, UrgencyLevel};
use crate::models::Message;

use super::context::{ContextStore, ConversationContext, DialogueState};
use super::emergency::{is_emergency, EMERGENCY_ALERT};
use super::emotion::{detect_emotion, empathetic_preface, EmotionReading};
use super::extraction::extract_symptoms;
use super::inference;
use super::intents::{self, Shortcut};
use super::normalize;
use super::prompt::{build_prompt, PromptContext, TRIAGE_SYSTEM_PROMPT};
use super::render::{render_fallback, render_medication_answer};
use super::teaching::{self, MedicationDetails};
use super::triage::{self, TriageAnswers, TriageProgress};
use super::urgency::{assess, with_disclaimer};
use super::DialogueError;

pub const CONVERSATION_ERROR_REPLY: &str =
    "Lo siento, hubo un error crítico al iniciar una nueva conversación. Por favor, intenta de nuevo más tarde.";
pub const CONNECTION_ERROR_REPLY: &str =
    "Error de conexión con la base de conocimientos. Por favor, intenta de nuevo en unos momentos.";
pub const GENERIC_ERROR_REPLY: &str =
    "Lo siento mucho, ocurrió un error inesperado al procesar tu mensaje. Por favor, intenta de nuevo.";

const TRIAGE_INTRO: &str = "Para ayudarte mejor, haré unas preguntas rápidas.";
const TRIAGE_NO_SYMPTOMS: &str =
    "No logré identificar síntomas específicos. Por favor, descríbeme con más detalle qué sientes.";
const NO_MATCHING_DISEASE: &str =
    "Con los síntomas que mencionas, no pude encontrar una enfermedad coincidente en mi base de conocimientos.";
const ASK_WHICH_DISEASE: &str =
    "Por favor, dime primero qué enfermedad tienes para poder darte una recomendación.";

/// Processes turns against injected collaborators.
///
/// The LLM and the encyclopedia are optional; without them the processor
/// answers from the knowledge base alone.
pub struct TurnProcessor<'a> {
    contexts: &'a ContextStore,
    knowledge: &'a dyn KnowledgeBase,
    log: &'a dyn ConversationLog,
    llm: Option<&'a dyn LlmGenerate>,
    encyclopedia: Option<&'a dyn Encyclopedia>,
    config: &'a AssistantConfig,
}

impl<'a> TurnProcessor<'a> {
    pub fn new(
        contexts: &'a ContextStore,
        knowledge: &'a dyn KnowledgeBase,
        log: &'a dyn ConversationLog,
        config: &'a AssistantConfig,
    ) -> Self {
        Self {
            contexts,
            knowledge,
            log,
            llm: None,
            encyclopedia: None,
            config,
        }
    }

    pub fn with_llm(mut self, llm: &'a dyn LlmGenerate) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_encyclopedia(mut self, encyclopedia: &'a dyn Encyclopedia) -> Self {
        self.encyclopedia = Some(encyclopedia);
        self
    }

    // ═══════════════════════════════════════════════════════════
    // Public surface
    // ═══════════════════════════════════════════════════════════

    /// Handle one user message and return the assistant reply.
    ///
    /// Never fails: collaborator errors and panics become user-facing messages.
    /// The user message is persisted before the reply. A `conversation_id` the
    /// user does not own is ignored.
    pub fn process_message(&self, user_id: i64, text: &str, conversation_id: Option<Uuid>) -> String {
        let slot = match self.contexts.entry(user_id) {
            Ok(slot) => slot,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Context store unavailable");
                return GENERIC_ERROR_REPLY.to_string();
            }
        };
        // Held for the whole turn: turns of one user never interleave.
        // The stored context is only replaced on success, so a poisoned lock
        // still guards a consistent value.
        let mut stored = slot.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(user_id, "Recovering context lock poisoned by an earlier turn");
            slot.clear_poison();
            poisoned.into_inner()
        });

        let conv_id = match self.open_conversation(user_id, text, conversation_id, stored.conversation_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to open conversation");
                return CONVERSATION_ERROR_REPLY.to_string();
            }
        };
        stored.conversation_id = Some(conv_id);

        tracing::info!(
            user_id,
            conversation_id = %conv_id,
            state = stored.state.label(),
            chars = text.chars().count(),
            "Processing message"
        );

        if let Err(e) = self.log.append_message(conv_id, MessageRole::User, text) {
            tracing::warn!(conversation_id = %conv_id, error = %e, "Failed to persist user message");
        }

        let mut working = stored.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.respond(&mut working, conv_id, text)));
        let reply = match outcome {
            Ok(Ok(reply)) => {
                *stored = working;
                reply
            }
            Ok(Err(DialogueError::Database(e))) => {
                tracing::error!(user_id, conversation_id = %conv_id, error = %e, "Knowledge base failure during turn");
                CONNECTION_ERROR_REPLY.to_string()
            }
            Ok(Err(e)) => {
                tracing::error!(user_id, conversation_id = %conv_id, error = %e, "Turn failed");
                GENERIC_ERROR_REPLY.to_string()
            }
            Err(_) => {
                tracing::error!(user_id, conversation_id = %conv_id, "Turn panicked");
                GENERIC_ERROR_REPLY.to_string()
            }
        };

        if let Err(e) = self.log.append_message(conv_id, MessageRole::Assistant, &reply) {
            tracing::warn!(conversation_id = %conv_id, error = %e, "Failed to persist assistant reply");
        }
        reply
    }

    /// Discard the user's in-memory context. Persisted history is kept.
    pub fn reset_context(&self, user_id: i64) {
        match self.contexts.reset(user_id) {
            Ok(existed) => tracing::info!(user_id, existed, "Context reset"),
            Err(e) => tracing::error!(user_id, error = %e, "Context reset failed"),
        }
    }

    /// A requested id is honoured only when it exists and belongs to `user_id`;
    /// otherwise the turn continues in the current or a new conversation.
    fn open_conversation(
        &self,
        user_id: i64,
        text: &str,
        requested: Option<Uuid>,
        current: Option<Uuid>,
    ) -> Result<Uuid, DialogueError> {
        if let Some(id) = requested {
            match self.log.conversation_owner(id)? {
                Some(owner) if owner == user_id => return Ok(id),
                Some(_) => {
                    tracing::warn!(user_id, conversation_id = %id, "Requested conversation belongs to another user")
                }
                None => tracing::warn!(user_id, conversation_id = %id, "Requested conversation does not exist"),
            }
        }
        if let Some(id) = current {
            return Ok(id);
        }
        let id = self.log.create_conversation(user_id, text)?;
        tracing::info!(user_id, conversation_id = %id, "Conversation created");
        Ok(id)
    }

    // ═══════════════════════════════════════════════════════════
    // Routing
    // ═══════════════════════════════════════════════════════════

    fn respond(&self, ctx: &mut ConversationContext, conv_id: Uuid, text: &str) -> Result<String, DialogueError> {
        let normalized = normalize(text);
        let emotion = detect_emotion(text);

        // Emergencies leave every sub-flow exactly where it was.
        if is_emergency(&normalized) {
            tracing::warn!(
                conversation_id = %conv_id,
                urgency = UrgencyLevel::Emergency.as_str(),
                "Red flag detected"
            );
            return Ok(EMERGENCY_ALERT.to_string());
        }

        if let Some(shortcut) = intents::detect_shortcut(&normalized) {
            tracing::debug!(?shortcut, "Conversational shortcut");
            return Ok(self.shortcut_reply(ctx, shortcut, &emotion));
        }

        match ctx.state.clone() {
            DialogueState::TriageActive { step, answers } => {
                return self.triage_step(ctx, conv_id, text, step, answers, &emotion);
            }
            DialogueState::AwaitingDiseaseName { reported_symptom } => {
                return self.teach_disease(ctx, text, reported_symptom, &emotion);
            }
            DialogueState::AwaitingMedicationDetails {
                reported_symptom,
                disease_name,
                disease_id,
            } => {
                return self.teach_medication(ctx, text, &reported_symptom, &disease_name, disease_id, &emotion);
            }
            DialogueState::Free => {}
        }

        if triage::is_trigger(&normalized) {
            ctx.state = DialogueState::TriageActive {
                step: 0,
                answers: TriageAnswers::default(),
            };
            tracing::info!(conversation_id = %conv_id, "Triage started");
            return Ok(format!(
                "{}\n\n{TRIAGE_INTRO}\n{}",
                empathetic_preface(Some(Emotion::Malaise), 1),
                triage::question_prompt(0)
            ));
        }

        if intents::is_medication_question(&normalized) {
            return self.medication_answer(ctx, text, &emotion);
        }

        if intents::is_info_question(&normalized) {
            if let Some(topic) = intents::extract_topic(text) {
                return self.encyclopedia_answer(ctx, &topic, &emotion);
            }
        }

        let extraction = extract_symptoms(&normalized, self.knowledge);
        if let Some(temperature) = extraction.temperature {
            ctx.set_temperature(temperature);
        }
        tracing::debug!(symptoms = ?extraction.symptoms, temperature = ?extraction.temperature, "Extraction");

        if extraction.symptoms.is_empty() {
            return Ok(self.free_chat(ctx, conv_id, text, &emotion));
        }

        ctx.add_symptoms(&extraction.symptoms);
        self.retitle(conv_id, &ctx.detected_symptoms);
        self.diagnose(ctx, conv_id, text, None, &emotion)
    }

    fn shortcut_reply(&self, ctx: &mut ConversationContext, shortcut: Shortcut, emotion: &EmotionReading) -> String {
        match shortcut {
            Shortcut::Greeting => {
                ctx.reset_flows();
                intents::GREETING_REPLY.to_string()
            }
            Shortcut::Gratitude => {
                ctx.reset_flows();
                format!("{}\n\n{}", emotion.preface(), intents::GRATITUDE_REPLY)
            }
            Shortcut::Improvement => {
                ctx.clear_episode();
                format!(
                    "{}\n\n{}",
                    empathetic_preface(Some(Emotion::Relief), 2),
                    intents::IMPROVEMENT_REPLY
                )
            }
            Shortcut::Farewell => {
                ctx.reset_flows();
                intents::FAREWELL_REPLY.to_string()
            }
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Triage
    // ═══════════════════════════════════════════════════════════

    fn triage_step(
        &self,
        ctx: &mut ConversationContext,
        conv_id: Uuid,
        text: &str,
        step: usize,
        mut answers: TriageAnswers,
        emotion: &EmotionReading,
    ) -> Result<String, DialogueError> {
        match triage::advance(step, text, &mut answers) {
            TriageProgress::Ask { step, prompt } => {
                ctx.state = DialogueState::TriageActive { step, answers };
                Ok(prompt)
            }
            TriageProgress::Finished => {
                ctx.state = DialogueState::Free;
                if let Some(temperature) = answers.temperature {
                    ctx.set_temperature(temperature);
                }
                let derived = triage::derive_symptoms(&answers);
                tracing::info!(conversation_id = %conv_id, symptoms = ?derived, "Triage finished");
                ctx.last_triage = Some(answers.clone());

                if derived.is_empty() {
                    return Ok(TRIAGE_NO_SYMPTOMS.to_string());
                }
                ctx.add_symptoms(&derived);
                self.retitle(conv_id, &ctx.detected_symptoms);
                self.diagnose(ctx, conv_id, text, Some(&answers), emotion)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Teaching
    // ═══════════════════════════════════════════════════════════

    fn start_teaching(&self, ctx: &mut ConversationContext, text: &str, emotion: &EmotionReading) -> String {
        ctx.state = DialogueState::AwaitingDiseaseName {
            reported_symptom: text.trim().to_string(),
        };
        format!("{}\n\n{}", emotion.preface(), teaching::ASK_DISEASE)
    }

    fn teach_disease(
        &self,
        ctx: &mut ConversationContext,
        text: &str,
        reported_symptom: String,
        emotion: &EmotionReading,
    ) -> Result<String, DialogueError> {
        let Some(disease_name) = teaching::parse_disease_name(text) else {
            return Ok(teaching::DISEASE_NAME_REPROMPT.to_string());
        };

        let disease_id = self.knowledge.upsert_disease(
            &disease_name,
            Some(teaching::TAUGHT_DISEASE_DESCRIPTION),
            KnowledgeSource::Taught,
        )?;
        tracing::info!(disease = %disease_name, disease_id, "Taught disease stored");

        ctx.state = DialogueState::AwaitingMedicationDetails {
            reported_symptom,
            disease_name,
            disease_id,
        };
        Ok(format!("{}\n\n{}", emotion.preface(), teaching::ASK_MEDICATION))
    }

    fn teach_medication(
        &self,
        ctx: &mut ConversationContext,
        text: &str,
        reported_symptom: &str,
        disease_name: &str,
        disease_id: i64,
        emotion: &EmotionReading,
    ) -> Result<String, DialogueError> {
        let Some(details) = teaching::parse_medication_details(text) else {
            return Ok(format!("{}\n\n{}", emotion.preface(), teaching::MEDICATION_FORMAT_REPROMPT));
        };

        self.knowledge.upsert_medication_and_rule(
            &details.name,
            Some(teaching::TAUGHT_MEDICATION_DESCRIPTION),
            disease_id,
            &details.dosage,
            &details.duration,
        )?;
        tracing::info!(disease_id, medication = %details.name, "Taught medication stored");

        if self.config.learn_synonyms {
            self.learn_reported_phrase(reported_symptom, disease_id);
        }

        ctx.complete_diagnosis(disease_name);
        Ok(self.learned_reply(disease_name, &details, emotion))
    }

    fn learn_reported_phrase(&self, reported_symptom: &str, disease_id: i64) {
        let phrase = normalize(reported_symptom);
        match self
            .knowledge
            .learn_symptom_phrase(&phrase, disease_id, teaching::LEARNED_RULE_WEIGHT)
        {
            Ok(()) => tracing::info!(phrase = %phrase, disease_id, "Learned symptom phrase"),
            Err(e) => tracing::warn!(phrase = %phrase, error = %e, "Failed to learn symptom phrase"),
        }
    }

    fn learned_reply(&self, disease_name: &str, details: &MedicationDetails, emotion: &EmotionReading) -> String {
        format!("{}\n\n{}", emotion.preface(), teaching::learned_message(disease_name, details))
    }

    // ═══════════════════════════════════════════════════════════
    // Questions
    // ═══════════════════════════════════════════════════════════

    fn medication_answer(
        &self,
        ctx: &ConversationContext,
        text: &str,
        emotion: &EmotionReading,
    ) -> Result<String, DialogueError> {
        let disease = intents::disease_after_para(text)
            .or_else(|| ctx.pending_diagnosis.clone())
            .or_else(|| ctx.last_topic.clone());
        let Some(disease) = disease else {
            return Ok(format!("{}\n\n{ASK_WHICH_DISEASE}", emotion.preface()));
        };

        let display = teaching::capitalize(&disease);
        let body = match self.knowledge.medication_for_disease_name(&disease)? {
            Some(medication) => render_medication_answer(&display, &medication),
            None => format!("No tengo aún una recomendación registrada para **{display}**."),
        };
        Ok(format!("{}\n\n{body}", emotion.preface()))
    }

    fn encyclopedia_answer(
        &self,
        ctx: &mut ConversationContext,
        topic: &str,
        emotion: &EmotionReading,
    ) -> Result<String, DialogueError> {
        let not_found = format!("{}\n\nNo encontré información sobre eso.", emotion.preface());
        let Some(encyclopedia) = self.encyclopedia else {
            return Ok(not_found);
        };

        let entry = match encyclopedia.summary(topic) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Encyclopedia lookup failed");
                return Ok(not_found);
            }
        };

        match entry {
            Some(EncyclopediaEntry::Summary(raw)) => {
                let Some(summary) = clean_summary(&raw) else {
                    tracing::debug!(topic = %topic, "Summary had no usable sentences");
                    return Ok(not_found);
                };
                let name = teaching::capitalize(topic);
                if let Err(e) = self
                    .knowledge
                    .upsert_disease(&name, Some(&summary), KnowledgeSource::Encyclopedia)
                {
                    tracing::warn!(topic = %topic, error = %e, "Failed to store encyclopedia summary");
                }
                ctx.last_topic = Some(topic.to_string());
                Ok(format!(
                    "{}\n\n🧠 He aprendido sobre '{topic}' y lo he guardado.\n\n{summary}",
                    emotion.preface()
                ))
            }
            Some(EncyclopediaEntry::Disambiguation(options)) if !options.is_empty() => {
                let list: Vec<String> = options.iter().map(|o| format!("• {o}")).collect();
                Ok(format!(
                    "{}\n\n'{topic}' puede referirse a varias cosas:\n{}\n¿Podrías ser más específico?",
                    emotion.preface(),
                    list.join("\n")
                ))
            }
            _ => Ok(not_found),
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Diagnosis and generation
    // ═══════════════════════════════════════════════════════════

    /// No symptoms: let the LLM chat, otherwise ask to be taught.
    fn free_chat(&self, ctx: &mut ConversationContext, conv_id: Uuid, text: &str, emotion: &EmotionReading) -> String {
        let prompt_ctx = PromptContext {
            message: text,
            temperature: ctx.temperature_c,
            previous_diagnosis: ctx.pending_diagnosis.as_deref(),
            triage: ctx.last_triage.as_ref(),
            ..PromptContext::default()
        };
        if let Some(reply) = self.llm_reply(conv_id, text, prompt_ctx) {
            let urgency = assess(&ctx.detected_symptoms, ctx.temperature_c);
            ctx.reset_flows();
            return with_disclaimer(&reply, urgency);
        }
        self.start_teaching(ctx, text, emotion)
    }

    fn diagnose(
        &self,
        ctx: &mut ConversationContext,
        conv_id: Uuid,
        text: &str,
        triage: Option<&TriageAnswers>,
        emotion: &EmotionReading,
    ) -> Result<String, DialogueError> {
        let symptoms = ctx.detected_symptoms.clone();
        let diagnosis = inference::score(&symptoms, self.knowledge, self.config.generic_disease_id)?;
        tracing::debug!(scores = ?diagnosis.scores, "Inference scores");

        let Some(disease_id) = diagnosis.best else {
            return Ok(format!("{}\n\n{NO_MATCHING_DISEASE}", emotion.preface()));
        };
        let disease = self
            .knowledge
            .disease(disease_id)?
            .ok_or(DialogueError::MissingDisease(disease_id))?;
        let medication = self.knowledge.medication_for_disease(disease_id)?;
        let urgency = assess(&symptoms, ctx.temperature_c);
        let resolved = diagnosis.resolved_symptoms();

        tracing::info!(
            conversation_id = %conv_id,
            disease = %disease.name,
            urgency = urgency.as_str(),
            "Diagnosis produced"
        );

        let prompt_ctx = PromptContext {
            message: text,
            symptoms: &resolved,
            temperature: ctx.temperature_c,
            diagnosis: Some(disease.name.as_str()),
            previous_diagnosis: ctx.pending_diagnosis.as_deref(),
            triage,
            ..PromptContext::default()
        };
        let body = match self.llm_reply(conv_id, text, prompt_ctx) {
            Some(reply) => reply,
            None => format!(
                "{}\n\n{}",
                emotion.preface(),
                render_fallback(&disease, medication.as_ref())
            ),
        };

        ctx.complete_diagnosis(&disease.name);
        Ok(with_disclaimer(&body, urgency))
    }

    /// Ask the LLM, treating any failure as "no answer" for this turn only.
    fn llm_reply(&self, conv_id: Uuid, text: &str, prompt_ctx: PromptContext<'_>) -> Option<String> {
        if !self.config.llm_enabled {
            return None;
        }
        let llm = self.llm?;

        let history = self.history(conv_id, text);
        let prompt_ctx = PromptContext {
            history: &history,
            ..prompt_ctx
        };
        let prompt = build_prompt(&prompt_ctx, self.config.history_window);
        tracing::debug!(prompt_chars = prompt.len(), history = history.len(), "Calling LLM");

        match llm.generate(TRIAGE_SYSTEM_PROMPT, &prompt) {
            Ok(reply) if !reply.trim().is_empty() => Some(reply.trim().to_string()),
            Ok(_) => {
                tracing::warn!("LLM returned empty text, using fallback");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "LLM unavailable, using fallback");
                None
            }
        }
    }

    /// Prior messages, without the message of the current turn.
    fn history(&self, conv_id: Uuid, text: &str) -> Vec<Message> {
        let mut messages = match self.log.get_messages(conv_id) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(conversation_id = %conv_id, error = %e, "History unavailable");
                return Vec::new();
            }
        };
        if messages
            .last()
            .is_some_and(|m| m.role == MessageRole::User && m.content == text)
        {
            messages.pop();
        }
        messages
    }

    fn retitle(&self, conv_id: Uuid, symptoms: &[String]) {
        if let Err(e) = self.log.set_title(conv_id, &symptom_title(symptoms)) {
            tracing::warn!(conversation_id = %conv_id, error = %e, "Failed to update conversation title");
        }
    }
}
