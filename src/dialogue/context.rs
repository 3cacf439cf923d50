use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::extraction::{finalize_symptoms, MAX_TEMPERATURE_C, MIN_TEMPERATURE_C};
use super::triage::TriageAnswers;
use super::DialogueError;

// ═══════════════════════════════════════════════════════════
// Dialogue state
// ═══════════════════════════════════════════════════════════

/// Which sub-flow owns the next message. Exactly one at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogueState {
    #[default]
    Free,
    /// Interview in progress; `step` is the question awaiting an answer.
    TriageActive { step: usize, answers: TriageAnswers },
    /// Nothing matched `reported_symptom`; waiting for the disease name.
    AwaitingDiseaseName { reported_symptom: String },
    /// Disease stored; waiting for `name, dose, frequency, duration`.
    AwaitingMedicationDetails {
        reported_symptom: String,
        disease_name: String,
        disease_id: i64,
    },
}

impl DialogueState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::TriageActive { .. } => "triage_active",
            Self::AwaitingDiseaseName { .. } => "awaiting_disease_name",
            Self::AwaitingMedicationDetails { .. } => "awaiting_medication_details",
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Per-user context
// ═══════════════════════════════════════════════════════════

/// Conversational memory of one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationContext {
    pub state: DialogueState,
    /// Canonical symptoms accumulated since the last diagnosis, in first-seen order.
    pub detected_symptoms: Vec<String>,
    pub pending_diagnosis: Option<String>,
    pub temperature_c: Option<f64>,
    pub conversation_id: Option<Uuid>,
    /// Last disease looked up in the encyclopedia, for medication follow-ups.
    pub last_topic: Option<String>,
    /// Answers of the most recently completed interview.
    pub last_triage: Option<TriageAnswers>,
}

impl ConversationContext {
    /// Merge newly detected symptoms, keeping order and uniqueness.
    pub fn add_symptoms(&mut self, symptoms: &[String]) {
        let mut merged = std::mem::take(&mut self.detected_symptoms);
        merged.extend(symptoms.iter().cloned());
        self.detected_symptoms = finalize_symptoms(merged);
    }

    /// Record a reading; out-of-range values are ignored.
    pub fn set_temperature(&mut self, temperature: f64) {
        if (MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&temperature) {
            self.temperature_c = Some(temperature);
        }
    }

    /// Leave any triage or teaching sub-flow.
    pub fn reset_flows(&mut self) {
        self.state = DialogueState::Free;
    }

    /// A diagnosis closes the symptom-gathering cycle.
    pub fn complete_diagnosis(&mut self, disease_name: &str) {
        self.pending_diagnosis = Some(disease_name.to_string());
        self.detected_symptoms.clear();
        self.state = DialogueState::Free;
    }

    /// The user reports feeling better: forget the previous episode.
    pub fn clear_episode(&mut self) {
        self.pending_diagnosis = None;
        self.detected_symptoms.clear();
        self.temperature_c = None;
        self.last_triage = None;
        self.state = DialogueState::Free;
    }
}

// ═══════════════════════════════════════════════════════════
// ContextStore
// ═══════════════════════════════════════════════════════════

/// In-memory contexts keyed by user id.
///
/// Each context sits behind its own lock so turns of one user are serialized
/// while different users proceed in parallel.
#[derive(Default)]
pub struct ContextStore {
    contexts: Mutex<HashMap<i64, Arc<Mutex<ConversationContext>>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's context, created on first contact.
    pub fn entry(&self, user_id: i64) -> Result<Arc<Mutex<ConversationContext>>, DialogueError> {
        let mut contexts = self.contexts.lock().map_err(|_| DialogueError::LockPoisoned)?;
        Ok(Arc::clone(contexts.entry(user_id).or_default()))
    }

    /// Discard the user's context. Returns whether one existed.
    pub fn reset(&self, user_id: i64) -> Result<bool, DialogueError> {
        let mut contexts = self.contexts.lock().map_err(|_| DialogueError::LockPoisoned)?;
        Ok(contexts.remove(&user_id).is_some())
    }

    /// Copy of the user's context, if any.
    pub fn snapshot(&self, user_id: i64) -> Result<Option<ConversationContext>, DialogueError> {
        let slot = {
            let contexts = self.contexts.lock().map_err(|_| DialogueError::LockPoisoned)?;
            contexts.get(&user_id).cloned()
        };
        match slot {
            Some(slot) => {
                let ctx = slot.lock().map_err(|_| DialogueError::LockPoisoned)?;
                Ok(Some(ctx.clone()))
            }
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
