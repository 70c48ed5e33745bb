use std::sync::Arc;

use aircare_chatlog::ChatLogger;
use aircare_core::{AircareConfig, Result};
use aircare_engine::{Engine, SopCatalog};
use aircare_llm::{LlmProvider, OllamaProvider};
use aircare_memory::MemoryStore;
use aircare_normalizer::TextNormalizer;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;

/// Central shared state, handed to every handler as `State<Arc<AppState>>`.
pub struct AppState {
    pub engine: Engine,
    pub config: AircareConfig,
    pub feedback_log_path: String,
}

impl AppState {
    pub fn new(config: AircareConfig, sop_path: &str, feedback_log_path: &str) -> Result<Self> {
        let memory = Arc::new(MemoryStore::new(config.memory_path.as_str(), config.max_history)?);
        let chatlog = Arc::new(ChatLogger::new("data/logs")?);
        let sop = Arc::new(SopCatalog::load_from_file(sop_path)?);
        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
            Duration::from_secs(config.ollama.timeout_secs),
            config.ollama.fallback_host.clone(),
        ));

        let normalizer = TextNormalizer::new();
        let engine = Engine { memory, llm, chatlog, sop, config: config.clone(), normalizer };
        Ok(Self { engine, config, feedback_log_path: feedback_log_path.to_string() })
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::handlers::health_handler))
        .route("/chat", post(crate::handlers::chat_handler))
        .route("/feedback", post(crate::handlers::feedback_handler))
        .route("/admin/reset", post(crate::handlers::admin_reset_handler))
        .route("/admin/stats", get(crate::handlers::admin_stats_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
