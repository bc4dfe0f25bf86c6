use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{error::ApiError, extract::ApiJson, state::AppState};
use crate::domain::{Document, DocumentChunk};

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub name: String,
    pub content: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            content_type: doc.content_type,
            metadata: doc.metadata,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentDetailResponse {
    #[serde(flatten)]
    pub document: DocumentResponse,
    pub chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub id: Uuid,
    pub chunk_index: usize,
    pub content: String,
}

impl From<DocumentChunk> for ChunkResponse {
    fn from(chunk: DocumentChunk) -> Self {
        Self {
            id: chunk.id,
            chunk_index: chunk.chunk_index,
            content: chunk.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    #[serde(flatten)]
    pub document: DocumentResponse,
    pub chunks_created: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchDocumentsRequest {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultResponse {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub score: f32,
}

pub async fn create_document(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let (doc, chunks) = state
        .documents
        .ingest(&request.name, &request.content, request.content_type.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            document: doc.into(),
            chunks_created: chunks.len(),
        }),
    ))
}

/// Accepts a `file` part holding UTF-8 text and an optional `name` part that
/// overrides the uploaded file name.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let mut name = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("name") => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.body_text()))?,
                );
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|_| ApiError::bad_request("uploaded file must be UTF-8 text"))?;
                file = Some((file_name, content_type, text));
            }
            _ => {}
        }
    }

    let (file_name, content_type, text) =
        file.ok_or_else(|| ApiError::bad_request("multipart field 'file' is required"))?;
    let name = name
        .or(file_name)
        .ok_or_else(|| ApiError::bad_request("document name is required"))?;

    let (doc, chunks) = state
        .documents
        .ingest(&name, &text, content_type.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            document: doc.into(),
            chunks_created: chunks.len(),
        }),
    ))
}

pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let docs = state.documents.list().await?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentDetailResponse>, ApiError> {
    let (doc, chunks) = state
        .documents
        .get_with_chunks(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("document {id}")))?;

    Ok(Json(DocumentDetailResponse {
        document: doc.into(),
        chunks: chunks.into_iter().map(Into::into).collect(),
    }))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.documents.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_documents(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchDocumentsRequest>,
) -> Result<Json<Vec<SearchResultResponse>>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }
    let limit = request.limit.unwrap_or(state.config.config.rag.top_k);
    let results = state.documents.search(&request.query, limit).await?;

    Ok(Json(
        results
            .into_iter()
            .map(|r| SearchResultResponse {
                chunk_id: r.chunk.id,
                document_id: r.chunk.document_id,
                content: r.chunk.content,
                score: r.score,
            })
            .collect(),
    ))
}
