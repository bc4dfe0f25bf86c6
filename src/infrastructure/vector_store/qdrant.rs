use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorStore {
    pub async fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };
        store.ensure_collection().await?;
        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;
            info!(collection = %self.collection, dimension = self.dimension, "created collection");
        }
        Ok(())
    }

    fn to_point(&self, chunk: &DocumentChunk, embedding: &Embedding) -> Result<PointStruct, DomainError> {
        if embedding.dimension() != self.dimension {
            return Err(DomainError::validation(format!(
                "embedding has {} dimensions, collection expects {}",
                embedding.dimension(),
                self.dimension
            )));
        }

        let payload: Payload = serde_json::json!({
            "document_id": chunk.document_id.to_string(),
            "content": chunk.content,
            "chunk_index": chunk.chunk_index,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            chunk.id.to_string(),
            embedding.as_slice().to_vec(),
            payload,
        ))
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    #[instrument(skip(self, points), fields(count = points.len()))]
    async fn upsert_chunks(&self, points: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        if points.is_empty() {
            return Ok(());
        }

        let points = points
            .iter()
            .map(|(chunk, embedding)| self.to_point(chunk, embedding))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, query: &Embedding, top_k: usize) -> Result<Vec<SearchResult>, DomainError> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        // Points with an unreadable payload are skipped rather than failing the query.
        let results = response
            .result
            .into_iter()
            .filter_map(|point| {
                let chunk_id: Uuid = match point.id?.point_id_options? {
                    qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s) => s.parse().ok()?,
                    qdrant_client::qdrant::point_id::PointIdOptions::Num(_) => return None,
                };
                let payload = point.payload;
                let document_id: Uuid = payload.get("document_id")?.as_str()?.parse().ok()?;
                let content = payload.get("content")?.as_str()?.to_string();
                let chunk_index = payload.get("chunk_index")?.as_integer()? as usize;

                Some(SearchResult {
                    chunk: DocumentChunk {
                        id: chunk_id,
                        document_id,
                        content,
                        chunk_index,
                    },
                    score: point.score,
                })
            })
            .collect();

        Ok(results)
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<(), DomainError> {
        let filter = Filter::must([Condition::matches("document_id", document_id.to_string())]);

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(filter).wait(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;
        Ok(())
    }
}
