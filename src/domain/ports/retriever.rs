use async_trait::async_trait;

use crate::domain::{errors::DomainError, SearchResult};

#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Up to `k` results, best match first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, DomainError>;
}
