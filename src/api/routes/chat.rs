use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, extract::ApiJson, state::AppState};
use crate::domain::ConversationId;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub conversation_id: ConversationId,
    pub response: String,
}

/// A missing `conversation_id` starts a new conversation.
pub async fn chat_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let conversation_id = match request.conversation_id.as_deref() {
        Some(raw) => ConversationId::parse(raw)?,
        None => ConversationId::generate(),
    };

    let reply = state.chat.chat(&conversation_id, &request.message).await?;

    Ok(Json(ChatResponse {
        conversation_id: reply.conversation_id,
        response: reply.response,
    }))
}
