use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::EvaluationRequest;

pub mod queues {
    pub const EVALUATION_QUEUE: &str = "jobs:evaluate";
}

pub mod keys {
    use uuid::Uuid;

    pub fn job_status(job_id: &Uuid) -> String {
        format!("job:status:{}", job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobResult {
    fn new(job_id: Uuid, status: QueueJobStatus) -> Self {
        Self {
            job_id,
            status,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn pending(job_id: Uuid) -> Self {
        Self::new(job_id, QueueJobStatus::Pending)
    }

    pub fn processing(job_id: Uuid) -> Self {
        Self::new(job_id, QueueJobStatus::Processing)
    }

    pub fn completed(job_id: Uuid, result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            completed_at: Some(Utc::now()),
            ..Self::new(job_id, QueueJobStatus::Completed)
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
            ..Self::new(job_id, QueueJobStatus::Failed)
        }
    }
}

/// Queue payload for one background evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResponseJob {
    pub job_id: Uuid,
    pub request: EvaluationRequest,
    pub enqueued_at: DateTime<Utc>,
}

impl EvaluateResponseJob {
    /// Jobs are keyed by the assistant turn they grade, so the turn ids listed
    /// under a conversation double as job ids.
    pub fn new(request: EvaluationRequest) -> Self {
        Self {
            job_id: request.turn_id,
            request,
            enqueued_at: Utc::now(),
        }
    }
}
