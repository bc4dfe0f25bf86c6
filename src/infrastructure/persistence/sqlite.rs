use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{
    ports::{ConversationStore, DocumentStore, EvaluationStore},
    ConversationId, ConversationSummary, Document, DocumentChunk, DomainError, Evaluation, Turn,
    TurnRole,
};

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::internal(format!("database: {e}"))
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::internal(format!("corrupt {what} row: {e}"))
}

/// Opens the pool and applies the embedded migrations.
///
/// Accepts `sqlite:path/to/file.db` (parent directories are created) and
/// `sqlite::memory:` (a single shared connection so every query sees the same
/// database).
pub async fn connect(database_url: &str) -> Result<SqlitePool, DomainError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(db_err)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:");
    if !in_memory {
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DomainError::internal(format!("create {parent:?}: {e}")))?;
            }
        }
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    let pool = pool_options.connect_with(options).await.map_err(db_err)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| DomainError::internal(format!("migration failed: {e}")))?;

    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct TurnRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TurnRow> for Turn {
    type Error = DomainError;

    fn try_from(row: TurnRow) -> Result<Self, Self::Error> {
        Ok(Turn {
            id: Uuid::parse_str(&row.id).map_err(|e| corrupt("turn", e))?,
            conversation_id: ConversationId::parse(&row.conversation_id)
                .map_err(|e| corrupt("turn", e))?,
            role: TurnRole::from_db(&row.role)?,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EvaluationRow {
    id: String,
    conversation_id: String,
    turn_id: String,
    scores: String,
    feedback: String,
    document_ids: String,
    judge_model: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EvaluationRow> for Evaluation {
    type Error = DomainError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        Ok(Evaluation {
            id: Uuid::parse_str(&row.id).map_err(|e| corrupt("evaluation", e))?,
            conversation_id: ConversationId::parse(&row.conversation_id)
                .map_err(|e| corrupt("evaluation", e))?,
            turn_id: Uuid::parse_str(&row.turn_id).map_err(|e| corrupt("evaluation", e))?,
            scores: serde_json::from_str(&row.scores).map_err(|e| corrupt("evaluation", e))?,
            feedback: row.feedback,
            document_ids: serde_json::from_str(&row.document_ids)
                .map_err(|e| corrupt("evaluation", e))?,
            judge_model: row.judge_model,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    name: String,
    content_type: String,
    metadata: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DomainError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: Uuid::parse_str(&row.id).map_err(|e| corrupt("document", e))?,
            name: row.name,
            content_type: row.content_type,
            metadata: serde_json::from_str(&row.metadata).map_err(|e| corrupt("document", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    id: String,
    document_id: String,
    chunk_index: i64,
    content: String,
}

impl TryFrom<ChunkRow> for DocumentChunk {
    type Error = DomainError;

    fn try_from(row: ChunkRow) -> Result<Self, Self::Error> {
        Ok(DocumentChunk {
            id: Uuid::parse_str(&row.id).map_err(|e| corrupt("chunk", e))?,
            document_id: Uuid::parse_str(&row.document_id).map_err(|e| corrupt("chunk", e))?,
            chunk_index: usize::try_from(row.chunk_index).map_err(|e| corrupt("chunk", e))?,
            content: row.content,
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, DomainError>
where
    T: TryFrom<R, Error = DomainError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const EVALUATION_COLUMNS: &str =
    "id, conversation_id, turn_id, scores, feedback, document_ids, judge_model, created_at";

/// SQLite implementation of the conversation, evaluation and document ports.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn load_turns(&self, conversation_id: &ConversationId) -> Result<Vec<Turn>, DomainError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT id, conversation_id, role, content, created_at
             FROM turns WHERE conversation_id = ? ORDER BY seq",
        )
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert(rows)
    }

    async fn append_exchange(
        &self,
        conversation_id: &ConversationId,
        user: &Turn,
        assistant: &Turn,
    ) -> Result<(), DomainError> {
        if user.role != TurnRole::User || assistant.role != TurnRole::Assistant {
            return Err(DomainError::validation(
                "exchange must be a user turn then an assistant turn",
            ));
        }

        // Dropping the transaction before commit rolls both turns back.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO conversations (id, created_at, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(conversation_id.as_str())
        .bind(user.created_at)
        .bind(assistant.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for turn in [user, assistant] {
            sqlx::query(
                "INSERT INTO turns (id, conversation_id, role, content, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(turn.id.to_string())
            .bind(conversation_id.as_str())
            .bind(turn.role.as_db())
            .bind(&turn.content)
            .bind(turn.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, DomainError> {
        let rows: Vec<(String, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT c.id, COUNT(t.seq), c.created_at, c.updated_at
             FROM conversations c LEFT JOIN turns t ON t.conversation_id = c.id
             GROUP BY c.id ORDER BY c.updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(id, count, created_at, updated_at)| -> Result<_, DomainError> {
                Ok(ConversationSummary {
                    id: ConversationId::parse(&id).map_err(|e| corrupt("conversation", e))?,
                    turn_count: count.max(0) as usize,
                    created_at,
                    updated_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl EvaluationStore for SqliteStore {
    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<(), DomainError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM turns WHERE id = ? AND conversation_id = ?")
                .bind(evaluation.turn_id.to_string())
                .bind(evaluation.conversation_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        if role.as_deref() != Some(TurnRole::Assistant.as_db()) {
            return Err(DomainError::not_found(format!(
                "assistant turn {} in conversation {}",
                evaluation.turn_id, evaluation.conversation_id
            )));
        }

        let scores = serde_json::to_string(&evaluation.scores)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let document_ids = serde_json::to_string(&evaluation.document_ids)
            .map_err(|e| DomainError::internal(e.to_string()))?;

        sqlx::query(&format!(
            "INSERT INTO evaluations ({EVALUATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(evaluation.id.to_string())
        .bind(evaluation.conversation_id.as_str())
        .bind(evaluation.turn_id.to_string())
        .bind(scores)
        .bind(&evaluation.feedback)
        .bind(document_ids)
        .bind(&evaluation.judge_model)
        .bind(evaluation.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_evaluations(&self) -> Result<Vec<Evaluation>, DomainError> {
        let rows: Vec<EvaluationRow> = sqlx::query_as(&format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluations ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert(rows)
    }

    async fn list_evaluations_for(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Evaluation>, DomainError> {
        let rows: Vec<EvaluationRow> = sqlx::query_as(&format!(
            "SELECT {EVALUATION_COLUMNS} FROM evaluations WHERE conversation_id = ?
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert(rows)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn save_document(&self, doc: &Document) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO documents (id, name, content_type, metadata, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name,
                content_type = excluded.content_type, metadata = excluded.metadata,
                updated_at = excluded.updated_at",
        )
        .bind(doc.id.to_string())
        .bind(&doc.name)
        .bind(&doc.content_type)
        .bind(doc.metadata.to_string())
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, DomainError> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, name, content_type, metadata, created_at, updated_at
             FROM documents WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(Document::try_from).transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>, DomainError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, name, content_type, metadata, created_at, updated_at
             FROM documents ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert(rows)
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM document_chunks WHERE document_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)
    }

    async fn save_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for chunk in chunks {
            sqlx::query(
                "INSERT INTO document_chunks (id, document_id, chunk_index, content)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET content = excluded.content,
                    chunk_index = excluded.chunk_index",
            )
            .bind(chunk.id.to_string())
            .bind(chunk.document_id.to_string())
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.content)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)
    }

    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<DocumentChunk>, DomainError> {
        let rows: Vec<ChunkRow> = sqlx::query_as(
            "SELECT id, document_id, chunk_index, content
             FROM document_chunks WHERE document_id = ? ORDER BY chunk_index",
        )
        .bind(document_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert(rows)
    }
}
