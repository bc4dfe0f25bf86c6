use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::rag::RagService;
use crate::domain::{
    chunk_content, ports::DocumentStore, Document, DocumentChunk, DomainError, SearchResult,
};

/// Upper bound on `search` results, whatever the caller asks for.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Manages the knowledge base the chatbot answers from.
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    rag: Arc<RagService>,
    chunk_size: usize,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, rag: Arc<RagService>, chunk_size: usize) -> Self {
        Self {
            store,
            rag,
            chunk_size,
        }
    }

    /// Stores the document and its chunks, then indexes the chunks for
    /// retrieval. A failed index removes the document again so it never
    /// lingers without vectors.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn ingest(
        &self,
        name: &str,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<(Document, Vec<DocumentChunk>), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("document name must not be empty"));
        }
        if content.trim().is_empty() {
            return Err(DomainError::validation("document content must not be empty"));
        }

        let mut doc = Document::new(name.trim());
        if let Some(content_type) = content_type {
            doc = doc.with_content_type(content_type);
        }
        let chunks = chunk_content(doc.id, content, self.chunk_size);
        doc = doc.with_metadata(serde_json::json!({ "chunks": chunks.len() }));

        self.store.save_document(&doc).await?;
        if let Err(e) = self.persist_and_index(&chunks).await {
            warn!(document_id = %doc.id, error = %e, "ingest failed, removing document");
            self.rollback(doc.id).await;
            return Err(e);
        }

        info!(document_id = %doc.id, chunks = chunks.len(), "document ingested");
        Ok((doc, chunks))
    }

    async fn persist_and_index(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        self.store.save_chunks(chunks).await?;
        self.rag.index_chunks(chunks).await
    }

    async fn rollback(&self, id: Uuid) {
        // Some batches may have been upserted before the failure.
        if let Err(e) = self.rag.delete_document(id).await {
            warn!(document_id = %id, error = %e, "could not remove partial vectors");
        }
        if let Err(e) = self.store.delete_document(id).await {
            warn!(document_id = %id, error = %e, "could not remove document rows");
        }
    }

    pub async fn list(&self) -> Result<Vec<Document>, DomainError> {
        self.store.list_documents().await
    }

    #[instrument(skip(self))]
    pub async fn get_with_chunks(
        &self,
        id: Uuid,
    ) -> Result<Option<(Document, Vec<DocumentChunk>)>, DomainError> {
        match self.store.get_document(id).await? {
            Some(doc) => {
                let chunks = self.store.get_chunks(id).await?;
                Ok(Some((doc, chunks)))
            }
            None => Ok(None),
        }
    }

    /// Removes the document from both stores. Evaluations that cite its
    /// chunks keep their ids.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if self.store.get_document(id).await?.is_none() {
            return Err(DomainError::not_found(format!("document {id}")));
        }
        self.rag.delete_document(id).await?;
        self.store.delete_document(id).await
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, DomainError> {
        self.rag
            .retrieve_top_k(query, limit.clamp(1, MAX_SEARCH_LIMIT))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ports::EmbeddingService, Embedding};
    use crate::infrastructure::persistence::InMemoryStore;
    use crate::infrastructure::InMemoryVectorStore;
    use async_trait::async_trait;

    /// Embeds by text length so every chunk gets a distinct, valid vector.
    struct LengthEmbedding;

    #[async_trait]
    impl EmbeddingService for LengthEmbedding {
        async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
            Ok(Embedding::new(vec![1.0, text.len() as f32 / 100.0]))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct BrokenEmbedding;

    #[async_trait]
    impl EmbeddingService for BrokenEmbedding {
        async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
            Err(DomainError::external("embedding provider unavailable"))
        }

        async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            Err(DomainError::external("embedding provider unavailable"))
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn service_with(embedding: Arc<dyn EmbeddingService>, chunk_size: usize) -> DocumentService {
        let rag = Arc::new(RagService::new(embedding, Arc::new(InMemoryVectorStore::new())));
        DocumentService::new(Arc::new(InMemoryStore::new()), rag, chunk_size)
    }

    fn service() -> DocumentService {
        service_with(Arc::new(LengthEmbedding), 40)
    }

    #[tokio::test]
    async fn test_ingest_stores_and_indexes() {
        let docs = service();
        let (doc, chunks) = docs
            .ingest(
                "resume",
                "Education: B.S. Computer Science.\n\nExperience: five years backend.",
                Some("text/markdown"),
            )
            .await
            .unwrap();

        assert_eq!(doc.content_type, "text/markdown");
        assert_eq!(chunks.len(), 2);
        assert_eq!(docs.list().await.unwrap().len(), 1);

        let (_, stored) = docs.get_with_chunks(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(docs.search("education", 5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_content() {
        let err = service().ingest("resume", "  \n ", None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let docs = service();
        let (doc, _) = docs.ingest("notes", "Some text.", None).await.unwrap();

        docs.delete(doc.id).await.unwrap();
        assert!(docs.get_with_chunks(doc.id).await.unwrap().is_none());
        assert!(docs.search("text", 5).await.unwrap().is_empty());
        assert!(matches!(
            docs.delete(doc.id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_indexing_leaves_no_document_behind() {
        let docs = service_with(Arc::new(BrokenEmbedding), 40);

        let err = docs
            .ingest("resume", "Education: B.S. Computer Science.", None)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ExternalService(_)));
        assert!(docs.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_limit_is_capped() {
        let docs = service_with(Arc::new(LengthEmbedding), 10);
        let content: Vec<String> = (0..MAX_SEARCH_LIMIT + 10)
            .map(|i| format!("para {i}"))
            .collect();
        let (_, chunks) = docs
            .ingest("notes", &content.join("\n\n"), None)
            .await
            .unwrap();
        assert!(chunks.len() > MAX_SEARCH_LIMIT);

        let results = docs.search("para", 10_000).await.unwrap();
        assert_eq!(results.len(), MAX_SEARCH_LIMIT);
        assert_eq!(docs.search("para", 0).await.unwrap().len(), 1);
    }
}
