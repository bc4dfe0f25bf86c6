use async_trait::async_trait;

use crate::domain::{errors::DomainError, ConversationId, Evaluation};

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Fails with `NotFound` when the referenced turn does not exist.
    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<(), DomainError>;

    /// Newest first.
    async fn list_evaluations(&self) -> Result<Vec<Evaluation>, DomainError>;

    async fn list_evaluations_for(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Evaluation>, DomainError>;
}
