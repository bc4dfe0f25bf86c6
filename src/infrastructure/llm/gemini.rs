use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::gemini;

use crate::domain::{ports::LlmService, DomainError};

pub struct GeminiLlm {
    client: gemini::Client,
    model: String,
}

impl GeminiLlm {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: gemini::Client::from_env(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmService for GeminiLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let agent = self.client.agent(&self.model).build();
        agent
            .prompt(prompt)
            .await
            .map_err(|e| DomainError::external(format!("gemini: {e}")))
    }

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        let agent = self.client.agent(&self.model).preamble(system).build();
        agent
            .prompt(prompt)
            .await
            .map_err(|e| DomainError::external(format!("gemini: {e}")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
