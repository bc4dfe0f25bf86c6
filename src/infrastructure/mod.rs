pub mod config;
pub mod embedding;
pub mod llm;
pub mod persistence;
pub mod queue;
pub mod telemetry;
pub mod vector_store;

pub use config::{AppConfig, Config, EvaluationMode, LogFormat, PromptsConfig};
pub use embedding::TextEmbedding;
pub use llm::{build_llm, AnthropicLlm, GeminiLlm};
pub use persistence::{InMemoryStore, SqliteStore};
pub use queue::{
    create_pool, keys, queues, EvaluateResponseJob, JobResult, QueueError, QueueJobStatus,
    RedisPool,
};
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
