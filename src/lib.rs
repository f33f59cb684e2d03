pub mod api; // HTTP API
pub mod appointment; // Specialist matching, reasons, booking
pub mod config;
pub mod models;
pub mod pipeline; // Routing, agents, orchestration
pub mod store; // JSON-file persistence + reference data

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::appointment::AppointmentResolver;
use crate::config::AppConfig;
use crate::pipeline::agents::SpecialistAgentDispatch;
use crate::pipeline::llm::{GeminiClient, LlmGenerate, UnconfiguredGenerator};
use crate::pipeline::orchestrator::ChatOrchestrator;
use crate::pipeline::routing::{LlmDecisionSource, RoutingDecisionEngine};
use crate::store::{JsonAppointmentStore, JsonSessionStore, ReferenceData, StoreError};

/// Generative backend for `config`: Gemini when an API key is set,
/// otherwise a stand-in that fails every call. The flag reports which.
pub fn make_generator(config: &AppConfig) -> (Arc<dyn LlmGenerate>, bool) {
    let Some(key) = &config.gemini_api_key else {
        tracing::warn!("GEMINI_API_KEY not set; every message will degrade to the fallback reply");
        return (Arc::new(UnconfiguredGenerator), false);
    };
    match GeminiClient::new(key, &config.model, config.llm_timeout) {
        Ok(client) => {
            tracing::info!(model = %client.model(), "Gemini client ready");
            (Arc::new(client), true)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build Gemini client; running unconfigured");
            (Arc::new(UnconfiguredGenerator), false)
        }
    }
}

/// Wire stores, reference data, routing and agents into an [`ApiContext`].
pub fn build_context(
    config: &AppConfig,
    generator: Arc<dyn LlmGenerate>,
    llm_configured: bool,
) -> Result<ApiContext, StoreError> {
    let reference = Arc::new(ReferenceData::load(&config.data_dir)?);
    let sessions = Arc::new(JsonSessionStore::new(config.sessions_dir())?);
    let appointments = Arc::new(JsonAppointmentStore::new(config.appointments_path()));

    let engine = RoutingDecisionEngine::new(
        Arc::new(LlmDecisionSource::new(generator.clone())),
        config.llm_timeout,
        config.context_turns,
    );
    let dispatch =
        SpecialistAgentDispatch::single(generator, config.llm_timeout, config.context_turns);
    let orchestrator = ChatOrchestrator::new(engine, dispatch, sessions);
    let resolver = AppointmentResolver::new(reference, appointments);

    Ok(ApiContext::new(
        Arc::new(orchestrator),
        Arc::new(resolver),
        llm_configured,
    ))
}

pub fn run() {
    // A missing .env file is normal.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env();
    tracing::info!(
        data_dir = %config.data_dir.display(),
        bind = %config.bind_addr,
        context_turns = config.context_turns,
        "Configuration loaded"
    );

    // Built and dropped outside the async runtime: the blocking HTTP client
    // must not be torn down on a runtime thread.
    let (generator, llm_configured) = make_generator(&config);

    let ctx = match build_context(&config, generator.clone(), llm_configured) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize data directory");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(serve(ctx, config.bind_addr));
    drop(runtime);
    drop(generator);

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn serve(ctx: ApiContext, addr: SocketAddr) -> Result<(), String> {
    let server = api::start_api_server(ctx, addr).await?;
    tracing::info!(addr = %server.info.server_addr, "{} listening", config::APP_NAME);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.stop().await;
    Ok(())
}
