//! Collaborator doubles shared by the integration tests.

use std::cell::{Cell, RefCell};

use medibot::llm::{LlmError, LlmGenerate};

/// LLM that answers with a fixed text, or fails as if Ollama were down.
pub struct MockLlm {
    response: Option<String>,
    calls: Cell<usize>,
    prompts: RefCell<Vec<String>>,
}

impl MockLlm {
    pub fn answering(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

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
            .ok_or_else(|| LlmError::OllamaConnection("http://localhost:11434".into()))
    }
}
