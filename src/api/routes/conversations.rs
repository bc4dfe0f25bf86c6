use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{Conversation, ConversationId, ConversationSummary};

pub async fn list_conversations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    Ok(Json(state.conversations.list_conversations().await?))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let id = ConversationId::parse(&id)?;
    let turns = state.conversations.load_turns(&id).await?;
    if turns.is_empty() {
        return Err(ApiError::not_found(format!("conversation {id}")));
    }
    Ok(Json(Conversation::new(id, turns)))
}
