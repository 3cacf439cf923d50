//! External encyclopedia lookups for "¿qué es…?" questions.

pub mod clean;
pub mod wikipedia;

pub use clean::*;
pub use wikipedia::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncyclopediaError {
    #[error("Encyclopedia unreachable: {0}")]
    Connection(String),

    #[error("Encyclopedia returned error (status {status})")]
    Status { status: u16 },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// Result of a topic lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncyclopediaEntry {
    /// Raw summary text, not yet cleaned.
    Summary(String),
    /// The topic is ambiguous; candidate article titles.
    Disambiguation(Vec<String>),
}

pub trait Encyclopedia {
    /// `Ok(None)` when no article exists for `topic`.
    fn summary(&self, topic: &str) -> Result<Option<EncyclopediaEntry>, EncyclopediaError>;
}
