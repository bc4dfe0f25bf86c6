use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::anthropic;

use crate::domain::{ports::LlmService, DomainError};

/// Claude completions through rig. `ANTHROPIC_API_KEY` is read once, when
/// the client is built.
pub struct AnthropicLlm {
    client: anthropic::Client,
    model: String,
}

impl AnthropicLlm {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: anthropic::Client::from_env(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmService for AnthropicLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let agent = self.client.agent(&self.model).build();
        agent
            .prompt(prompt)
            .await
            .map_err(|e| DomainError::external(format!("anthropic: {e}")))
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
            .map_err(|e| DomainError::external(format!("anthropic: {e}")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
