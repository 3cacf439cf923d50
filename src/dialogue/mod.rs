//! Dialogue core: per-user context, symptom extraction, rule inference,
//! triage interview, teaching flow and response orchestration.

pub mod context;
pub mod emergency;
pub mod emotion;
pub mod extraction;
pub mod inference;
pub mod intents;
pub mod normalize;
pub mod processor;
pub mod prompt;
pub mod render;
pub mod teaching;
pub mod triage;
pub mod urgency;

pub use context::{ContextStore, ConversationContext, DialogueState};
pub use normalize::normalize;
pub use processor::TurnProcessor;
pub use crate::models::enums::{Emotion, UrgencyLevel};

use thiserror::Error;

use crate::db::DatabaseError;

/// Failures that abort a turn. LLM and encyclopedia errors never do: the
/// processor falls back and logs them.
#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Diagnosed disease {0} has no stored record")]
    MissingDisease(i64),

    #[error("Context lock poisoned")]
    LockPoisoned,
}
