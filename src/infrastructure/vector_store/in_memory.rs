use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

/// Brute-force cosine search over all stored chunks.
#[derive(Default)]
pub struct InMemoryVectorStore {
    points: RwLock<Vec<(DocumentChunk, Embedding)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert_chunks(&self, points: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        let mut store = self
            .points
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        for (chunk, embedding) in points {
            store.retain(|(c, _)| c.id != chunk.id);
            store.push((chunk.clone(), embedding.clone()));
        }
        Ok(())
    }

    async fn search(&self, query: &Embedding, top_k: usize) -> Result<Vec<SearchResult>, DomainError> {
        let store = self
            .points
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<SearchResult> = store
            .iter()
            .map(|(chunk, embedding)| SearchResult {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), DomainError> {
        let mut store = self
            .points
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        store.retain(|(chunk, _)| chunk.document_id != document_id);
        Ok(())
    }
}
