use deadpool_redis::redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::{ports::EvaluationScheduler, EvaluationRequest};
use crate::infrastructure::{
    keys, queues, EvaluateResponseJob, JobResult, QueueError, RedisPool,
};

/// Pushes evaluation jobs for the worker binary and reads their status.
#[derive(Clone)]
pub struct JobProducer {
    pool: RedisPool,
    result_ttl_seconds: u64,
}

impl JobProducer {
    pub fn new(pool: RedisPool, result_ttl_seconds: u64) -> Self {
        Self {
            pool,
            result_ttl_seconds,
        }
    }

    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, QueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Pool(e.to_string()))
    }

    pub async fn push_evaluation_job(&self, job: &EvaluateResponseJob) -> Result<Uuid, QueueError> {
        let payload = serde_json::to_string(job)?;
        let status = serde_json::to_string(&JobResult::pending(job.job_id))?;
        let mut conn = self.conn().await?;

        // Status first so a fast worker never overwrites `processing` with `pending`.
        conn.set_ex::<_, _, ()>(keys::job_status(&job.job_id), &status, self.result_ttl_seconds)
            .await
            .map_err(|e| QueueError::Redis(e.to_string()))?;
        conn.lpush::<_, _, ()>(queues::EVALUATION_QUEUE, &payload)
            .await
            .map_err(|e| QueueError::Redis(e.to_string()))?;

        tracing::info!(
            job_id = %job.job_id,
            turn_id = %job.request.turn_id,
            queue = queues::EVALUATION_QUEUE,
            "evaluation queued"
        );
        Ok(job.job_id)
    }

    pub async fn get_job_status(&self, job_id: &Uuid) -> Result<Option<JobResult>, QueueError> {
        let mut conn = self.conn().await?;
        let result: Option<String> = conn
            .get(keys::job_status(job_id))
            .await
            .map_err(|e| QueueError::Redis(e.to_string()))?;

        result
            .map(|json| serde_json::from_str(&json).map_err(Into::into))
            .transpose()
    }
}

impl EvaluationScheduler for JobProducer {
    fn submit(&self, request: EvaluationRequest) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(turn_id = %request.turn_id, "no async runtime, evaluation skipped");
            return;
        };

        let producer = self.clone();
        runtime.spawn(async move {
            let job = EvaluateResponseJob::new(request);
            if let Err(e) = producer.push_evaluation_job(&job).await {
                tracing::warn!(
                    kind = "evaluation_failed",
                    error = %e,
                    conversation_id = %job.request.conversation_id,
                    turn_id = %job.request.turn_id,
                    "evaluation could not be queued"
                );
            }
        });
    }
}
