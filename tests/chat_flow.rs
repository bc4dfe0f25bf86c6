use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use portfolio_chat::application::{
    BackgroundEvaluator, ChatService, ChatSettings, EvaluationService, RagService,
};
use portfolio_chat::domain::ports::{
    ConversationStore, EmbeddingService, EvaluationStore, LlmService, VectorStore,
};
use portfolio_chat::domain::{
    ConversationId, DocumentChunk, DomainError, Embedding, TurnRole,
};
use portfolio_chat::infrastructure::{AppConfig, InMemoryStore, InMemoryVectorStore};

/// Puts texts mentioning "rust" on one axis and everything else on another.
struct TopicEmbedding;

#[async_trait]
impl EmbeddingService for TopicEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let rust = text.to_lowercase().contains("rust");
        Ok(Embedding::new(if rust { vec![1.0, 0.0] } else { vec![0.0, 1.0] }))
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

struct Assistant;

#[async_trait]
impl LlmService for Assistant {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        if prompt.contains("Writes Rust services") {
            Ok("They write Rust services.".into())
        } else {
            Ok("I am not sure.".into())
        }
    }

    async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, DomainError> {
        self.complete(prompt).await
    }

    fn model(&self) -> &str {
        "assistant"
    }
}

struct Judge {
    delay: Duration,
}

#[async_trait]
impl LlmService for Judge {
    async fn complete(&self, _prompt: &str) -> Result<String, DomainError> {
        tokio::time::sleep(self.delay).await;
        Ok(r#"{"scores": {"correctness": 9, "coherence": 8}, "feedback": "Grounded."}"#.into())
    }

    async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, DomainError> {
        self.complete(prompt).await
    }

    fn model(&self) -> &str {
        "judge"
    }
}

async fn setup(judge_delay: Duration) -> (ChatService, Arc<InMemoryStore>) {
    let config = AppConfig::default();
    let store = Arc::new(InMemoryStore::new());

    let vectors = Arc::new(InMemoryVectorStore::new());
    let doc_id = uuid::Uuid::new_v4();
    let chunks = [
        DocumentChunk::new(doc_id, "Writes Rust services for a living.", 0),
        DocumentChunk::new(doc_id, "Enjoys hiking on weekends.", 1),
    ];
    let embedded: Vec<_> = [vec![1.0, 0.0], vec![0.0, 1.0]]
        .into_iter()
        .zip(chunks)
        .map(|(v, c)| (c, Embedding::new(v)))
        .collect();
    vectors.upsert_chunks(&embedded).await.unwrap();

    let rag = Arc::new(RagService::new(Arc::new(TopicEmbedding), vectors));
    let evaluator = EvaluationService::new(Arc::new(Judge { delay: judge_delay }), store.clone());

    let chat = ChatService::new(
        store.clone(),
        rag,
        Arc::new(Assistant),
        ChatSettings {
            top_k: 1,
            ..ChatSettings::from_config(&config)
        },
    )
    .with_evaluator(Arc::new(BackgroundEvaluator::new(Arc::new(evaluator))));

    (chat, store)
}

#[tokio::test]
async fn test_answer_is_grounded_and_evaluated_after_the_fact() {
    let (chat, store) = setup(Duration::from_millis(10)).await;
    let id = ConversationId::parse("visitor-42").unwrap();

    let reply = chat.chat(&id, "  What does Rust mean to them?  ").await.unwrap();
    assert_eq!(reply.response, "They write Rust services.");
    assert_eq!(reply.documents_used, 1);

    let turns = store.load_turns(&id).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, TurnRole::User);
    assert_eq!(turns[0].content, "What does Rust mean to them?");
    assert_eq!(turns[1].id, reply.turn_id);

    let mut evaluations = Vec::new();
    for _ in 0..100 {
        evaluations = store.list_evaluations_for(&id).await.unwrap();
        if !evaluations.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(evaluations.len(), 1);
    let evaluation = &evaluations[0];
    assert_eq!(evaluation.turn_id, reply.turn_id);
    assert_eq!(evaluation.score("correctness"), Some(9.0));
    assert_eq!(evaluation.judge_model, "judge");
    assert_eq!(evaluation.document_ids.len(), 1);
}

#[tokio::test]
async fn test_slow_judge_does_not_delay_the_reply() {
    let (chat, store) = setup(Duration::from_secs(30)).await;
    let id = ConversationId::parse("visitor-7").unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(2), chat.chat(&id, "hiking?"))
        .await
        .expect("reply must not wait for the judge")
        .unwrap();

    assert_eq!(reply.response, "I am not sure.");
    assert_eq!(store.load_turns(&id).await.unwrap().len(), 2);
    assert!(store.list_evaluations().await.unwrap().is_empty());
}

#[test]
fn test_shipped_config_files_parse() {
    let app = AppConfig::from_yaml(
        include_str!("../config/config.yaml"),
        include_str!("../config/prompts.yaml"),
    )
    .unwrap();

    assert_eq!(app.config.rag.top_k, 5);
    assert!(app.prompts.evaluation.template.contains("{documents}"));
    assert!(app.prompts.chat.system.contains("portfolio"));
}
