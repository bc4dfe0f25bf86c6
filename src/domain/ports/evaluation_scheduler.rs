use crate::domain::EvaluationRequest;

/// Submit-and-forget hand-off to the background evaluator.
///
/// `submit` must return without waiting on the evaluation or on any I/O;
/// implementations spawn their own work and only log failures.
pub trait EvaluationScheduler: Send + Sync {
    fn submit(&self, request: EvaluationRequest);
}
