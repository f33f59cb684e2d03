//! Shared types for the API layer.

use std::sync::Arc;

use crate::appointment::AppointmentResolver;
use crate::pipeline::orchestrator::ChatOrchestrator;
use crate::store::SessionStore;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub resolver: Arc<AppointmentResolver>,
    /// Whether a real generative backend is configured.
    pub llm_configured: bool,
}

impl ApiContext {
    pub fn new(
        orchestrator: Arc<ChatOrchestrator>,
        resolver: Arc<AppointmentResolver>,
        llm_configured: bool,
    ) -> Self {
        Self {
            orchestrator,
            resolver,
            llm_configured,
        }
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.orchestrator.sessions().clone()
    }
}

/// Run blocking store work off the async executor.
pub(crate) async fn blocking<T, E, F>(work: F) -> Result<T, crate::api::error::ApiError>
where
    T: Send + 'static,
    E: Into<crate::api::error::ApiError> + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| crate::api::error::ApiError::Internal(format!("Blocking task failed: {e}")))?
        .map_err(Into::into)
}
