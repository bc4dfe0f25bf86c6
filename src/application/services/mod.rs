mod chat;
mod document;
mod evaluator;
mod prompt;
mod rag;

pub use chat::{ChatReply, ChatService, ChatSettings};
pub use document::DocumentService;
pub use evaluator::{parse_verdict, BackgroundEvaluator, EvaluationService, Verdict};
pub use prompt::{assemble_prompt, format_documents, PromptParts};
pub use rag::RagService;
