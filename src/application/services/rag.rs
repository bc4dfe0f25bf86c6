use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ports::{DocumentRetriever, EmbeddingService, VectorStore},
    DocumentChunk, DomainError, SearchResult,
};

const EMBED_BATCH_SIZE: usize = 32;

pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
}

impl RagService {
    pub fn new(embedding: Arc<dyn EmbeddingService>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            vector_store,
        }
    }

    #[instrument(skip(self))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedding.embed(query).await?;
        let mut results = self.vector_store.search(&embedding, top_k).await?;
        results.truncate(top_k);
        Ok(results)
    }

    /// Embeds chunks in batches (batches run concurrently) and upserts them.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let batches = chunks.chunks(EMBED_BATCH_SIZE).map(|batch| async move {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedding.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(DomainError::external(format!(
                    "embedding provider returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }
            Ok::<_, DomainError>(batch.iter().cloned().zip(embeddings).collect::<Vec<_>>())
        });

        let points: Vec<_> = try_join_all(batches).await?.into_iter().flatten().collect();
        self.vector_store.upsert_chunks(&points).await
    }

    #[instrument(skip(self))]
    pub async fn delete_document(&self, document_id: Uuid) -> Result<(), DomainError> {
        self.vector_store.delete_by_document(document_id).await
    }
}

#[async_trait]
impl DocumentRetriever for RagService {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(query, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Embedding;
    use crate::infrastructure::InMemoryVectorStore;

    /// Maps text onto a fixed two-dimensional space by keyword.
    struct KeywordEmbedding;

    #[async_trait]
    impl EmbeddingService for KeywordEmbedding {
        async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
            let lower = text.to_lowercase();
            let school = if lower.contains("degree") || lower.contains("education") { 1.0 } else { 0.0 };
            let work = if lower.contains("work") || lower.contains("job") { 1.0 } else { 0.0 };
            Ok(Embedding::new(vec![school, work + 0.01]))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn service() -> RagService {
        RagService::new(
            Arc::new(KeywordEmbedding),
            Arc::new(InMemoryVectorStore::new()),
        )
    }

    #[tokio::test]
    async fn test_index_then_retrieve_ranks_best_match_first() {
        let rag = service();
        let doc_id = Uuid::new_v4();
        let chunks = vec![
            DocumentChunk::new(doc_id, "Work: backend engineer job", 0),
            DocumentChunk::new(doc_id, "Education: computer science degree", 1),
        ];
        rag.index_chunks(&chunks).await.unwrap();

        let results = rag.retrieve("What is his education?", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_index, 1);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_retrieve_respects_k_and_empty_store() {
        let rag = service();
        assert!(rag.retrieve("anything", 3).await.unwrap().is_empty());

        let doc_id = Uuid::new_v4();
        let chunks: Vec<_> = (0..4)
            .map(|i| DocumentChunk::new(doc_id, format!("job {i}"), i))
            .collect();
        rag.index_chunks(&chunks).await.unwrap();
        assert_eq!(rag.retrieve("job", 2).await.unwrap().len(), 2);
        assert!(rag.retrieve("job", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_document_removes_points() {
        let rag = service();
        let doc_id = Uuid::new_v4();
        rag.index_chunks(&[DocumentChunk::new(doc_id, "degree", 0)])
            .await
            .unwrap();
        rag.delete_document(doc_id).await.unwrap();
        assert!(rag.retrieve("degree", 5).await.unwrap().is_empty());
    }
}
