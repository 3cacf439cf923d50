use std::cell::{Cell, RefCell};

use super::{LlmError, LlmGenerate};

/// Scripted LLM for unit tests. Returns a fixed completion (or a fixed
/// failure) and records every prompt it was given.
pub struct MockLlm {
    response: Option<String>,
    calls: Cell<usize>,
    prompts: RefCell<Vec<String>>,
}

impl MockLlm {
    /// An LLM that always answers with `response`.
    pub fn answering(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// An LLM whose every call fails as if the service were down.
    pub fn failing() -> Self {
        Self {
            response: None,
            calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.borrow().last().cloned()
    }
}

impl LlmGenerate for MockLlm {
    fn generate(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls.set(self.calls.get() + 1);
        self.prompts.borrow_mut().push(prompt.to_string());
        self.response
            .clone()
            .ok_or_else(|| LlmError::OllamaConnection("mock".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answering_mock_returns_configured_response() {
        let llm = MockLlm::answering("test response");
        assert_eq!(llm.generate("system", "prompt").unwrap(), "test response");
        assert_eq!(llm.calls(), 1);
        assert_eq!(llm.last_prompt().as_deref(), Some("prompt"));
    }

    #[test]
    fn failing_mock_counts_calls() {
        let llm = MockLlm::failing();
        assert!(llm.generate("s", "p").is_err());
        assert!(llm.generate("s", "p").is_err());
        assert_eq!(llm.calls(), 2);
    }
}
