//! Generative-language adapter.
//!
//! The dialogue core only sees [`LlmGenerate`]. Any error coming out of an
//! implementation is treated as "unavailable for this turn" and the caller
//! falls back to the deterministic renderer.

#[cfg(test)]
pub mod mock;
pub mod ollama;

#[cfg(test)]
pub use mock::*;
pub use ollama::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model returned an empty completion")]
    EmptyCompletion,
}

/// Text generation used to augment triage responses.
pub trait LlmGenerate {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}
