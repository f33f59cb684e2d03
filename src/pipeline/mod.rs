pub mod agents;
pub mod context;
pub mod llm;
pub mod orchestrator;
pub mod routing;

use std::time::Duration;

/// Run a blocking generative call on the blocking pool, bounded by
/// `timeout`. Returns `None` when the deadline passes first; the blocking
/// task is left to finish on its own.
pub(crate) async fn run_blocking_with_timeout<T, F>(
    timeout: Duration,
    call: F,
) -> Option<Result<T, llm::LlmError>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, llm::LlmError> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(join_error)) => Some(Err(llm::LlmError::TaskFailed(join_error.to_string()))),
        Err(_) => None,
    }
}
