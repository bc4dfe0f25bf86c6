use sqlx::SqlitePool;
use std::sync::Arc;

use crate::api::queue::JobProducer;
use crate::application::{ChatService, DocumentService};
use crate::domain::ports::{ConversationStore, EvaluationStore};
use crate::infrastructure::{AppConfig, RedisPool};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chat: Arc<ChatService>,
    pub conversations: Arc<dyn ConversationStore>,
    pub evaluations: Arc<dyn EvaluationStore>,
    pub documents: Arc<DocumentService>,
    pub job_producer: Option<JobProducer>,
    pub redis_pool: Option<RedisPool>,
    pub db_pool: Option<SqlitePool>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        chat: Arc<ChatService>,
        conversations: Arc<dyn ConversationStore>,
        evaluations: Arc<dyn EvaluationStore>,
        documents: Arc<DocumentService>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            chat,
            conversations,
            evaluations,
            documents,
            job_producer: None,
            redis_pool: None,
            db_pool: None,
        }
    }

    pub fn with_job_producer(mut self, producer: JobProducer) -> Self {
        self.redis_pool = Some(producer.pool().clone());
        self.job_producer = Some(producer);
        self
    }

    pub fn with_database(mut self, pool: SqlitePool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}
