mod conversation;
mod document;
mod embedding;
mod evaluation;

pub use conversation::{Conversation, ConversationId, ConversationSummary, Turn, TurnRole};
pub use document::{chunk_content, Document, DocumentChunk, SearchResult};
pub use embedding::Embedding;
pub use evaluation::{Evaluation, EvaluationRequest};
