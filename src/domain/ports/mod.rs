mod conversation_store;
mod document_store;
mod embedding;
mod evaluation_scheduler;
mod evaluation_store;
mod llm;
mod retriever;
mod vector_store;

pub use conversation_store::ConversationStore;
pub use document_store::DocumentStore;
pub use embedding::EmbeddingService;
pub use evaluation_scheduler::EvaluationScheduler;
pub use evaluation_store::EvaluationStore;
pub use llm::LlmService;
pub use retriever::DocumentRetriever;
pub use vector_store::VectorStore;
