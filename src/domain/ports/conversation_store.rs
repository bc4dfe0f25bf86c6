use async_trait::async_trait;

use crate::domain::{errors::DomainError, ConversationId, ConversationSummary, Turn};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All turns of a conversation in the order they were appended. Unknown
    /// conversations yield an empty list.
    async fn load_turns(&self, conversation_id: &ConversationId) -> Result<Vec<Turn>, DomainError>;

    /// Appends a user turn and its assistant reply as one unit. Either both
    /// turns are stored or neither is.
    async fn append_exchange(
        &self,
        conversation_id: &ConversationId,
        user: &Turn,
        assistant: &Turn,
    ) -> Result<(), DomainError>;

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, DomainError>;
}
