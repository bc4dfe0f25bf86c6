use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{ConversationId, Evaluation};
use crate::infrastructure::JobResult;

#[derive(Debug, Deserialize)]
pub struct EvaluationsQuery {
    pub conversation_id: Option<String>,
}

pub async fn list_evaluations(
    State(state): State<AppState>,
    Query(query): Query<EvaluationsQuery>,
) -> Result<Json<Vec<Evaluation>>, ApiError> {
    let evaluations = match query.conversation_id.as_deref() {
        Some(raw) => {
            let id = ConversationId::parse(raw)?;
            state.evaluations.list_evaluations_for(&id).await?
        }
        None => state.evaluations.list_evaluations().await?,
    };
    Ok(Json(evaluations))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResult>, ApiError> {
    let producer = state
        .job_producer
        .as_ref()
        .ok_or_else(|| ApiError::not_found("evaluation queue is not enabled"))?;

    producer
        .get_job_status(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("job {job_id}")))
}
