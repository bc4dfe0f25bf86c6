mod anthropic;
mod gemini;

use std::sync::Arc;

pub use anthropic::AnthropicLlm;
pub use gemini::GeminiLlm;

use crate::domain::{ports::LlmService, DomainError};

/// Builds the completion client named by `provider`.
pub fn build_llm(provider: &str, model: &str) -> Result<Arc<dyn LlmService>, DomainError> {
    match provider {
        "anthropic" => Ok(Arc::new(AnthropicLlm::new(model))),
        "gemini" => Ok(Arc::new(GeminiLlm::new(model))),
        other => Err(DomainError::validation(format!(
            "unsupported llm provider '{other}' (expected anthropic or gemini)"
        ))),
    }
}
