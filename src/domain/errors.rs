use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }
}

/// Failure taxonomy of a chat turn.
///
/// Only [`ChatError::InvalidInput`], [`ChatError::GenerationFailed`] and
/// [`ChatError::Storage`] are ever returned to a caller. The degraded and
/// evaluation variants are emitted to logs only.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retrieval degraded: {0}")]
    RetrievalDegraded(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DomainError),
}

impl ChatError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Self::GenerationFailed(msg.into())
    }

    pub fn evaluation_failed(msg: impl Into<String>) -> Self {
        Self::EvaluationFailed(msg.into())
    }

    /// Stable identifier exposed in API error bodies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::RetrievalDegraded(_) => "retrieval_degraded",
            Self::GenerationFailed(_) => "generation_failed",
            Self::EvaluationFailed(_) => "evaluation_failed",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(ChatError::invalid_input("x").kind(), "invalid_input");
        assert_eq!(ChatError::generation_failed("x").kind(), "generation_failed");
        assert_eq!(
            ChatError::from(DomainError::internal("db")).kind(),
            "storage"
        );
        assert_eq!(
            ChatError::RetrievalDegraded("qdrant down".into()).kind(),
            "retrieval_degraded"
        );
        assert_eq!(ChatError::evaluation_failed("x").kind(), "evaluation_failed");
    }
}
