//! Application layer - use cases and orchestration.
//!
//! Services depend on domain ports (traits) rather than concrete
//! infrastructure, so every flow can run against in-memory fakes.

pub mod retry;
pub mod services;

pub use retry::RetryPolicy;
pub use services::{
    assemble_prompt, BackgroundEvaluator, ChatReply, ChatService, ChatSettings, DocumentService,
    EvaluationService, PromptParts, RagService,
};
