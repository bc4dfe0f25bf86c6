use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, DocumentChunk, Embedding, SearchResult};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces points keyed by chunk id.
    async fn upsert_chunks(&self, points: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError>;

    /// Best match first, at most `top_k` results.
    async fn search(&self, query: &Embedding, top_k: usize)
        -> Result<Vec<SearchResult>, DomainError>;

    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), DomainError>;
}
