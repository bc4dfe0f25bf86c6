use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::{
    ports::{ConversationStore, DocumentStore, EvaluationStore},
    ConversationId, ConversationSummary, Document, DocumentChunk, DomainError, Evaluation, Turn,
    TurnRole,
};

#[derive(Default)]
struct State {
    turns: HashMap<ConversationId, Vec<Turn>>,
    evaluations: Vec<Evaluation>,
    documents: HashMap<Uuid, Document>,
    chunks: HashMap<Uuid, Vec<DocumentChunk>>,
}

/// Process-local implementation of every relational port. Used by tests and
/// for running the API without a database file.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, DomainError> {
        self.state
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, DomainError> {
        self.state
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load_turns(&self, conversation_id: &ConversationId) -> Result<Vec<Turn>, DomainError> {
        Ok(self
            .read()?
            .turns
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_exchange(
        &self,
        conversation_id: &ConversationId,
        user: &Turn,
        assistant: &Turn,
    ) -> Result<(), DomainError> {
        if user.role != TurnRole::User || assistant.role != TurnRole::Assistant {
            return Err(DomainError::validation("exchange must be a user turn then an assistant turn"));
        }
        let mut state = self.write()?;
        let turns = state.turns.entry(conversation_id.clone()).or_default();
        turns.push(user.clone());
        turns.push(assistant.clone());
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, DomainError> {
        let state = self.read()?;
        let mut summaries: Vec<_> = state
            .turns
            .iter()
            .filter_map(|(id, turns)| {
                Some(ConversationSummary {
                    id: id.clone(),
                    turn_count: turns.len(),
                    created_at: turns.first()?.created_at,
                    updated_at: turns.last()?.created_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[async_trait]
impl EvaluationStore for InMemoryStore {
    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<(), DomainError> {
        let mut state = self.write()?;
        let turn_exists = state
            .turns
            .get(&evaluation.conversation_id)
            .is_some_and(|turns| {
                turns
                    .iter()
                    .any(|t| t.id == evaluation.turn_id && t.role == TurnRole::Assistant)
            });
        if !turn_exists {
            return Err(DomainError::not_found(format!(
                "assistant turn {} in conversation {}",
                evaluation.turn_id, evaluation.conversation_id
            )));
        }
        state.evaluations.push(evaluation.clone());
        Ok(())
    }

    async fn list_evaluations(&self) -> Result<Vec<Evaluation>, DomainError> {
        let mut evaluations = self.read()?.evaluations.clone();
        evaluations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(evaluations)
    }

    async fn list_evaluations_for(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Evaluation>, DomainError> {
        Ok(self
            .list_evaluations()
            .await?
            .into_iter()
            .filter(|e| &e.conversation_id == conversation_id)
            .collect())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn save_document(&self, doc: &Document) -> Result<(), DomainError> {
        self.write()?.documents.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, DomainError> {
        Ok(self.read()?.documents.get(&id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, DomainError> {
        let mut docs: Vec<_> = self.read()?.documents.values().cloned().collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.write()?;
        state.documents.remove(&id);
        state.chunks.remove(&id);
        Ok(())
    }

    async fn save_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        let mut state = self.write()?;
        for chunk in chunks {
            let entry = state.chunks.entry(chunk.document_id).or_default();
            entry.retain(|c| c.id != chunk.id);
            entry.push(chunk.clone());
            entry.sort_by_key(|c| c.chunk_index);
        }
        Ok(())
    }

    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<DocumentChunk>, DomainError> {
        Ok(self
            .read()?
            .chunks
            .get(&document_id)
            .cloned()
            .unwrap_or_default())
    }
}
