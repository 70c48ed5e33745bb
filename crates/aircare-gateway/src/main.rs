use std::net::SocketAddr;
use std::sync::Arc;

use aircare_core::AircareConfig;
use clap::Parser;
use tracing::info;

mod app;
mod handlers;

/// Aircare customer-service conversation gateway.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the SOP catalog JSON file.
    #[arg(long, default_value = "config/sop.json")]
    sop_path: String,

    /// Path to the feedback JSONL log file.
    #[arg(long, default_value = "data/logs/feedback.jsonl")]
    feedback_log_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "aircare_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AircareConfig::load().unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        AircareConfig::default()
    });

    let port = config.app_port;
    let state = Arc::new(app::AppState::new(config, &cli.sop_path, &cli.feedback_log_path)?);
    let router = app::build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("aircare gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
