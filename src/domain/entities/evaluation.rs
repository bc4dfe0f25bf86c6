use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{ConversationId, SearchResult};

/// Everything the evaluator needs to judge one assistant turn.
///
/// Built only after the assistant turn has been persisted, so `turn_id`
/// always refers to an existing turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub conversation_id: ConversationId,
    pub turn_id: Uuid,
    pub question: String,
    pub answer: String,
    pub documents: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub turn_id: Uuid,
    pub scores: BTreeMap<String, f64>,
    pub feedback: String,
    pub document_ids: Vec<Uuid>,
    pub judge_model: String,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    pub fn new(
        request: &EvaluationRequest,
        scores: BTreeMap<String, f64>,
        feedback: impl Into<String>,
        judge_model: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: request.conversation_id.clone(),
            turn_id: request.turn_id,
            scores,
            feedback: feedback.into(),
            document_ids: request.documents.iter().map(|d| d.chunk.id).collect(),
            judge_model: judge_model.into(),
            created_at: Utc::now(),
        }
    }

    pub fn score(&self, name: &str) -> Option<f64> {
        self.scores.get(name).copied()
    }
}
