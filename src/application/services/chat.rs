use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::prompt::{assemble_prompt, PromptParts};
use crate::domain::{
    ports::{ConversationStore, DocumentRetriever, EvaluationScheduler, LlmService},
    ChatError, Conversation, ConversationId, EvaluationRequest, Turn,
};
use crate::infrastructure::config::AppConfig;

/// Fixed parameters of the chat flow.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub instructions: String,
    pub no_documents: String,
    pub top_k: usize,
    pub history_turns: usize,
    pub max_message_chars: usize,
    pub generation_timeout: Duration,
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            instructions: config.prompts.chat.system.clone(),
            no_documents: config.prompts.chat.no_documents.clone(),
            top_k: config.config.rag.top_k,
            history_turns: config.config.chat.history_turns,
            max_message_chars: config.config.chat.max_message_chars,
            generation_timeout: Duration::from_secs(config.config.llm.timeout_seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub conversation_id: ConversationId,
    pub turn_id: Uuid,
    pub response: String,
    pub documents_used: usize,
}

/// Handles one visitor message end to end: history, retrieval, prompt,
/// generation, persistence, then hands the result to the evaluator.
pub struct ChatService {
    conversations: Arc<dyn ConversationStore>,
    retriever: Arc<dyn DocumentRetriever>,
    generator: Arc<dyn LlmService>,
    evaluator: Option<Arc<dyn EvaluationScheduler>>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        retriever: Arc<dyn DocumentRetriever>,
        generator: Arc<dyn LlmService>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            conversations,
            retriever,
            generator,
            evaluator: None,
            settings,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn EvaluationScheduler>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    #[instrument(skip(self, message), fields(conversation_id = %conversation_id))]
    pub async fn chat(
        &self,
        conversation_id: &ConversationId,
        message: &str,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::invalid_input("message must not be empty"));
        }
        if message.chars().count() > self.settings.max_message_chars {
            return Err(ChatError::invalid_input(format!(
                "message exceeds {} characters",
                self.settings.max_message_chars
            )));
        }
        let received_at = Utc::now();

        let history = Conversation::new(
            conversation_id.clone(),
            self.conversations.load_turns(conversation_id).await?,
        );

        let documents = match self.retriever.retrieve(message, self.settings.top_k).await {
            Ok(documents) => documents,
            Err(e) => {
                let degraded = ChatError::RetrievalDegraded(e.to_string());
                warn!(kind = degraded.kind(), error = %degraded, "answering without context");
                Vec::new()
            }
        };

        let prompt = assemble_prompt(&PromptParts {
            instructions: &self.settings.instructions,
            documents: &documents,
            history: history.recent_turns(self.settings.history_turns),
            message,
            no_documents: &self.settings.no_documents,
        });

        let response = self.generate(&prompt).await?;

        let user_turn = Turn::user(conversation_id.clone(), message, received_at);
        let assistant_turn = Turn::assistant(conversation_id.clone(), response.as_str());
        self.conversations
            .append_exchange(conversation_id, &user_turn, &assistant_turn)
            .await?;

        info!(
            turn_id = %assistant_turn.id,
            documents = documents.len(),
            history = history.turns.len(),
            "chat turn stored"
        );

        let documents_used = documents.len();
        if let Some(evaluator) = &self.evaluator {
            evaluator.submit(EvaluationRequest {
                conversation_id: conversation_id.clone(),
                turn_id: assistant_turn.id,
                question: message.to_string(),
                answer: response.clone(),
                documents,
            });
        }

        Ok(ChatReply {
            conversation_id: conversation_id.clone(),
            turn_id: assistant_turn.id,
            response,
            documents_used,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let timeout = self.settings.generation_timeout;
        let text = tokio::time::timeout(timeout, self.generator.complete(prompt))
            .await
            .map_err(|_| {
                ChatError::generation_failed(format!(
                    "model did not answer within {}s",
                    timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| ChatError::generation_failed(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(ChatError::generation_failed("model returned an empty answer"));
        }
        Ok(text)
    }
}
