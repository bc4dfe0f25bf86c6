use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::prompt::{fill_placeholders, format_documents};
use crate::application::retry::RetryPolicy;
use crate::domain::{
    ports::{EvaluationScheduler, EvaluationStore, LlmService},
    ChatError, Evaluation, EvaluationRequest,
};
use crate::infrastructure::config::{AppConfig, EvaluationPrompts};

const MAX_SCORE: f64 = 10.0;

/// Judge output as requested by the evaluation prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub feedback: String,
}

/// Extracts the JSON verdict from a judge reply. Tolerates code fences and
/// prose around the object.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ChatError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => return Err(ChatError::evaluation_failed("judge reply contains no JSON object")),
    };

    let verdict: Verdict = serde_json::from_str(json)
        .map_err(|e| ChatError::evaluation_failed(format!("judge reply is not a verdict: {e}")))?;

    if let Some((name, value)) = verdict
        .scores
        .iter()
        .find(|(_, v)| !v.is_finite() || **v < 0.0 || **v > MAX_SCORE)
    {
        return Err(ChatError::evaluation_failed(format!(
            "score '{name}' = {value} is outside 0..={MAX_SCORE}"
        )));
    }
    Ok(verdict)
}

pub struct EvaluationService {
    judge: Arc<dyn LlmService>,
    store: Arc<dyn EvaluationStore>,
    prompts: EvaluationPrompts,
    no_documents: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl EvaluationService {
    pub fn new(judge: Arc<dyn LlmService>, store: Arc<dyn EvaluationStore>) -> Self {
        Self::from_config(judge, store, &AppConfig::default())
    }

    pub fn from_config(
        judge: Arc<dyn LlmService>,
        store: Arc<dyn EvaluationStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            judge,
            store,
            prompts: config.prompts.evaluation.clone(),
            no_documents: config.prompts.chat.no_documents.clone(),
            retry: RetryPolicy::from_config(&config.config.evaluation),
            timeout: Duration::from_secs(config.config.evaluation.timeout_seconds),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn judge_prompt(&self, request: &EvaluationRequest) -> String {
        let documents = format_documents(&request.documents, &self.no_documents);
        fill_placeholders(
            &self.prompts.template,
            &[
                ("question", request.question.as_str()),
                ("answer", request.answer.as_str()),
                ("documents", documents.as_str()),
            ],
        )
    }

    /// Asks the judge model for a verdict, retrying transient failures.
    #[instrument(skip(self, request), fields(turn_id = %request.turn_id))]
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, ChatError> {
        let prompt = self.judge_prompt(request);
        let prompt = prompt.as_str();
        let this = self;

        let verdict = self
            .retry
            .retry("evaluate_response", || async move {
                let raw = tokio::time::timeout(
                    this.timeout,
                    this.judge.complete_with_system(&this.prompts.system, prompt),
                )
                .await
                .map_err(|_| ChatError::evaluation_failed("judge timed out"))?
                .map_err(|e| ChatError::evaluation_failed(e.to_string()))?;
                parse_verdict(&raw)
            })
            .await?;

        Ok(Evaluation::new(
            request,
            verdict.scores,
            verdict.feedback,
            self.judge.model(),
        ))
    }

    pub async fn evaluate_and_store(
        &self,
        request: &EvaluationRequest,
    ) -> Result<Evaluation, ChatError> {
        let evaluation = self.evaluate(request).await?;
        self.store
            .save_evaluation(&evaluation)
            .await
            .map_err(|e| ChatError::evaluation_failed(format!("could not store: {e}")))?;
        Ok(evaluation)
    }
}

/// Runs evaluations as detached tokio tasks in the current process.
pub struct BackgroundEvaluator {
    service: Arc<EvaluationService>,
}

impl BackgroundEvaluator {
    pub fn new(service: Arc<EvaluationService>) -> Self {
        Self { service }
    }
}

impl EvaluationScheduler for BackgroundEvaluator {
    fn submit(&self, request: EvaluationRequest) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(turn_id = %request.turn_id, "no async runtime, evaluation skipped");
            return;
        };

        let service = self.service.clone();
        runtime.spawn(async move {
            match service.evaluate_and_store(&request).await {
                Ok(evaluation) => info!(
                    evaluation_id = %evaluation.id,
                    conversation_id = %request.conversation_id,
                    turn_id = %request.turn_id,
                    "evaluation stored"
                ),
                Err(e) => warn!(
                    kind = e.kind(),
                    error = %e,
                    conversation_id = %request.conversation_id,
                    turn_id = %request.turn_id,
                    "evaluation dropped"
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ports::ConversationStore, ConversationId, DocumentChunk, DomainError, SearchResult, Turn,
    };
    use crate::infrastructure::persistence::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    const GOOD: &str = r#"{"scores": {"correctness": 9, "comprehensiveness": 7.5, "coherence": 8}, "feedback": "Supported by [1]."}"#;

    /// Fails `failures` times before returning `reply`.
    struct FlakyJudge {
        failures: usize,
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl FlakyJudge {
        fn new(failures: usize, reply: &'static str) -> Self {
            Self {
                failures,
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmService for FlakyJudge {
        async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
            self.complete_with_system("", prompt).await
        }

        async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, DomainError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(DomainError::external("overloaded"))
            } else {
                Ok(self.reply.to_string())
            }
        }

        fn model(&self) -> &str {
            "judge-test"
        }
    }

    async fn stored_request(store: &InMemoryStore) -> EvaluationRequest {
        let id = ConversationId::parse("c1").unwrap();
        let user = Turn::user(id.clone(), "What is Nick's education?", Utc::now());
        let assistant = Turn::assistant(id.clone(), "Nick has a B.S. in ...");
        store.append_exchange(&id, &user, &assistant).await.unwrap();

        let doc_id = Uuid::new_v4();
        EvaluationRequest {
            conversation_id: id,
            turn_id: assistant.id,
            question: user.content,
            answer: assistant.content,
            documents: vec![
                SearchResult {
                    chunk: DocumentChunk::new(doc_id, "B.S. in Computer Science", 0),
                    score: 0.9,
                },
                SearchResult {
                    chunk: DocumentChunk::new(doc_id, "Graduated 2020", 1),
                    score: 0.8,
                },
            ],
        }
    }

    fn service(judge: FlakyJudge, store: Arc<InMemoryStore>) -> EvaluationService {
        EvaluationService::new(Arc::new(judge), store).with_retry(RetryPolicy::new(
            2,
            Duration::from_millis(1),
            Duration::from_millis(2),
        ))
    }

    #[test]
    fn test_parse_plain_and_fenced_verdicts() {
        let plain = parse_verdict(GOOD).unwrap();
        assert_eq!(plain.scores["correctness"], 9.0);
        assert_eq!(plain.feedback, "Supported by [1].");

        let fenced = format!("Here you go:\n```json\n{GOOD}\n```");
        assert_eq!(parse_verdict(&fenced).unwrap().scores.len(), 3);
    }

    #[test]
    fn test_parse_allows_missing_scores() {
        let verdict = parse_verdict(r#"{"feedback": "nothing to grade"}"#).unwrap();
        assert!(verdict.scores.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_verdicts() {
        assert!(parse_verdict("no json here").is_err());
        assert!(parse_verdict(r#"{"scores": {"correctness": "high"}}"#).is_err());
        let err = parse_verdict(r#"{"scores": {"coherence": 42}}"#).unwrap_err();
        assert_eq!(err.kind(), "evaluation_failed");
    }

    #[tokio::test]
    async fn test_judge_prompt_contains_numbered_documents() {
        let store = Arc::new(InMemoryStore::new());
        let request = stored_request(&store).await;
        let prompt = service(FlakyJudge::new(0, GOOD), store).judge_prompt(&request);

        assert!(prompt.contains("What is Nick's education?"));
        assert!(prompt.contains("Nick has a B.S. in ..."));
        assert!(prompt.contains("[1] B.S. in Computer Science"));
        assert!(prompt.contains("[2] Graduated 2020"));
    }

    #[tokio::test]
    async fn test_judge_prompt_keeps_braces_in_user_text() {
        let store = Arc::new(InMemoryStore::new());
        let mut request = stored_request(&store).await;
        request.question = "Explain {answer} and {documents}".into();
        let prompt = service(FlakyJudge::new(0, GOOD), store).judge_prompt(&request);

        assert!(prompt.contains("Explain {answer} and {documents}"));
        assert_eq!(prompt.matches("Nick has a B.S. in ...").count(), 1);
        assert_eq!(prompt.matches("[1] B.S. in Computer Science").count(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_and_store_after_retries() {
        let store = Arc::new(InMemoryStore::new());
        let request = stored_request(&store).await;
        let evaluator = service(FlakyJudge::new(2, GOOD), store.clone());

        let evaluation = evaluator.evaluate_and_store(&request).await.unwrap();
        assert_eq!(evaluation.turn_id, request.turn_id);
        assert_eq!(evaluation.document_ids.len(), 2);
        assert_eq!(evaluation.judge_model, "judge-test");
        assert_eq!(evaluation.score("coherence"), Some(8.0));

        let stored = store.list_evaluations().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, evaluation.id);
    }

    #[tokio::test]
    async fn test_exhausted_retries_store_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let request = stored_request(&store).await;
        let evaluator = service(FlakyJudge::new(10, GOOD), store.clone());

        let err = evaluator.evaluate_and_store(&request).await.unwrap_err();
        assert!(matches!(err, ChatError::EvaluationFailed(_)));
        assert!(store.list_evaluations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_turn_is_never_evaluated() {
        let store = Arc::new(InMemoryStore::new());
        let mut request = stored_request(&store).await;
        request.turn_id = Uuid::new_v4();

        let err = service(FlakyJudge::new(0, GOOD), store.clone())
            .evaluate_and_store(&request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "evaluation_failed");
        assert!(store.list_evaluations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_background_evaluator_does_not_block_submit() {
        let store = Arc::new(InMemoryStore::new());
        let request = stored_request(&store).await;
        let background = BackgroundEvaluator::new(Arc::new(service(
            FlakyJudge::new(0, GOOD),
            store.clone(),
        )));

        background.submit(request);

        let mut stored = Vec::new();
        for _ in 0..100 {
            stored = store.list_evaluations().await.unwrap();
            if !stored.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stored.len(), 1);
    }
}
