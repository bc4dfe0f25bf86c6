use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A knowledge-base source such as the resume or a project write-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content_type: "text/plain".to_string(),
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
        }
    }
}

/// A retrieved chunk with its similarity score. Results are ordered by rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Splits content into chunks by paragraph boundaries.
///
/// Paragraphs are joined until adding the next one would exceed `chunk_size`
/// bytes. A single paragraph longer than `chunk_size` is split further on
/// whitespace. Chunk indices are sequential from 0.
pub fn chunk_content(document_id: Uuid, content: &str, chunk_size: usize) -> Vec<DocumentChunk> {
    let chunk_size = chunk_size.max(1);
    let pieces = content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .flat_map(|p| split_long_paragraph(p, chunk_size));

    let mut texts: Vec<String> = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        if !current.is_empty() && current.len() + piece.len() + 2 > chunk_size {
            texts.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&piece);
    }
    if !current.is_empty() {
        texts.push(current);
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| DocumentChunk::new(document_id, text, i))
        .collect()
}

fn split_long_paragraph(paragraph: &str, chunk_size: usize) -> Vec<String> {
    if paragraph.len() <= chunk_size {
        return vec![paragraph.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > chunk_size {
            parts.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_content_single_chunk() {
        let doc_id = Uuid::new_v4();
        let content = "B.S. in Computer Science.\n\nWorked on data platforms.";
        let chunks = chunk_content(doc_id, content, 100);

        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].content,
            "B.S. in Computer Science.\n\nWorked on data platforms."
        );
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].document_id, doc_id);
    }

    #[test]
    fn test_chunk_content_multiple_chunks() {
        let doc_id = Uuid::new_v4();
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_content(doc_id, content, 30);

        assert_eq!(chunks.len(), 3);
        let indices: Vec<_> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_long_paragraph_is_split_on_whitespace() {
        let doc_id = Uuid::new_v4();
        let content = "alpha beta gamma delta epsilon zeta";
        let chunks = chunk_content(doc_id, content, 12);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.len() <= 12));
        let rejoined = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined, content);
    }

    #[test]
    fn test_chunk_content_empty() {
        let doc_id = Uuid::new_v4();
        assert!(chunk_content(doc_id, "", 100).is_empty());
        assert!(chunk_content(doc_id, "\n\n  \n\n", 100).is_empty());
    }
}
