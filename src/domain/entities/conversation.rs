use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::DomainError;

const MAX_CONVERSATION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Validates a caller-supplied identifier.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(DomainError::validation("conversation id must not be empty"));
        }
        if id.len() > MAX_CONVERSATION_ID_LEN {
            return Err(DomainError::validation(format!(
                "conversation id exceeds {MAX_CONVERSATION_ID_LEN} characters"
            )));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        {
            return Err(DomainError::validation(
                "conversation id may only contain letters, digits, '-', '_', '.', ':'",
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Time-ordered identifier for conversations the caller did not name.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn from_db(value: &str) -> Result<Self, DomainError> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(DomainError::internal(format!("unknown turn role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        conversation_id: ConversationId,
        role: TurnRole,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.into(),
            created_at,
        }
    }

    pub fn user(conversation_id: ConversationId, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(conversation_id, TurnRole::User, content, at)
    }

    pub fn assistant(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self::new(conversation_id, TurnRole::Assistant, content, Utc::now())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(id: ConversationId, turns: Vec<Turn>) -> Self {
        Self { id, turns }
    }

    /// The last `n` turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub turn_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_accepts_simple_ids() {
        let id = ConversationId::parse("  c1 ").unwrap();
        assert_eq!(id.as_str(), "c1");
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert!(ConversationId::parse("   ").is_err());
        assert!(ConversationId::parse("has space").is_err());
        assert!(ConversationId::parse(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let id = ConversationId::generate();
        assert!(ConversationId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_recent_turns_keeps_chronological_tail() {
        let id = ConversationId::parse("c1").unwrap();
        let turns = (0..5)
            .map(|i| Turn::user(id.clone(), format!("m{i}"), Utc::now()))
            .collect();
        let conversation = Conversation::new(id, turns);

        let recent: Vec<_> = conversation
            .recent_turns(2)
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(recent, vec!["m3", "m4"]);
        assert_eq!(conversation.recent_turns(10).len(), 5);
    }
}
