use deadpool_redis::{redis::AsyncCommands, Connection};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::info;
use uuid::Uuid;

use portfolio_chat::application::EvaluationService;
use portfolio_chat::infrastructure::{
    build_llm, create_pool, keys, persistence::sqlite, queues, telemetry, AppConfig,
    EvaluateResponseJob, JobResult, RedisPool, SqliteStore,
};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Worker shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, WorkerError>;

pub struct WorkerState {
    pub redis_pool: RedisPool,
    pub evaluator: Arc<EvaluationService>,
    pub result_ttl_seconds: u64,
}

pub struct JobConsumer {
    state: Arc<WorkerState>,
    concurrency: usize,
}

impl JobConsumer {
    pub fn new(state: WorkerState, concurrency: usize) -> Self {
        Self {
            state: Arc::new(state),
            concurrency,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        info!(concurrency = self.concurrency, queue = queues::EVALUATION_QUEUE, "consumer started");

        loop {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Closed)?;
            let state = self.state.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_next_job(&state).await {
                    tracing::error!(error = %e, "job failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            });

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

async fn conn(state: &WorkerState) -> Result<Connection> {
    state
        .redis_pool
        .get()
        .await
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

async fn set_status(
    state: &WorkerState,
    conn: &mut Connection,
    job_id: Uuid,
    status: &JobResult,
) -> Result<()> {
    let json = serde_json::to_string(status)?;
    conn.set_ex::<_, _, ()>(keys::job_status(&job_id), &json, state.result_ttl_seconds)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))
}

async fn process_next_job(state: &WorkerState) -> Result<()> {
    let mut c = conn(state).await?;

    let result: Option<(String, String)> = c
        .brpop(queues::EVALUATION_QUEUE, 1.0)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))?;

    if let Some((_queue, job_json)) = result {
        let job: EvaluateResponseJob = serde_json::from_str(&job_json)?;
        process_evaluation_job(state, &mut c, job).await?;
    }
    Ok(())
}

async fn process_evaluation_job(
    state: &WorkerState,
    c: &mut Connection,
    job: EvaluateResponseJob,
) -> Result<()> {
    let request = &job.request;
    info!(
        job_id = %job.job_id,
        conversation_id = %request.conversation_id,
        turn_id = %request.turn_id,
        "processing evaluation"
    );
    set_status(state, c, job.job_id, &JobResult::processing(job.job_id)).await?;

    match state.evaluator.evaluate_and_store(request).await {
        Ok(evaluation) => {
            set_status(
                state,
                c,
                job.job_id,
                &JobResult::completed(
                    job.job_id,
                    serde_json::json!({
                        "evaluation_id": evaluation.id,
                        "conversation_id": evaluation.conversation_id,
                        "turn_id": evaluation.turn_id,
                        "scores": evaluation.scores,
                    }),
                ),
            )
            .await?;
            info!(job_id = %job.job_id, evaluation_id = %evaluation.id, "evaluation stored");
        }
        Err(e) => {
            tracing::warn!(
                job_id = %job.job_id,
                kind = e.kind(),
                error = %e,
                turn_id = %request.turn_id,
                "evaluation dropped"
            );
            set_status(state, c, job.job_id, &JobResult::failed(job.job_id, e.to_string())).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load()?;
    let config = &app_config.config;
    telemetry::init_tracing("worker=debug,portfolio_chat=debug", config.logging.format);
    app_config.log_summary();

    let redis_pool = create_pool(&config.redis_url)?;
    info!("Redis pool initialized");

    let db_pool = sqlite::connect(&config.database_url).await?;
    let store = Arc::new(SqliteStore::new(db_pool));
    info!("database ready");

    let judge = build_llm(&config.llm.provider, app_config.judge_model())?;
    let evaluator = Arc::new(EvaluationService::from_config(judge, store, &app_config));

    let state = WorkerState {
        redis_pool,
        evaluator,
        result_ttl_seconds: config.worker.result_ttl_seconds,
    };
    let consumer = JobConsumer::new(state, config.worker.concurrency.max(1));

    info!(judge = app_config.judge_model(), "worker started");
    consumer.start().await?;

    Ok(())
}
