//! toolshedd — job execution daemon behind the portfolio tool endpoints.

use std::sync::Arc;

use anyhow::{Context, Result};

use toolshed_core::config::ToolshedConfig;
use toolshed_services::{
    ArtifactStore, GeminiGenerator, GeminiSettings, Orchestrator, YtDlpFetcher, YtDlpSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = ToolshedConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = ToolshedConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        let mut config = ToolshedConfig::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    });
    tracing::info!(
        bind = %config.server.bind,
        port = config.server.port,
        "toolshedd starting"
    );

    // Temp artifacts
    let artifacts = ArtifactStore::new(&config.media.temp_dir)?;
    tracing::info!(root = %config.media.temp_dir.display(), "temp artifact directory ready");

    // Knowledge base
    let knowledge = load_knowledge(&config.chat.knowledge_path);

    // Executors
    let fetcher = Arc::new(YtDlpFetcher::new(YtDlpSettings::from(&config.media)));
    if config.chat.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set — chat requests will fail");
    }
    let generator = Arc::new(
        GeminiGenerator::new(GeminiSettings::from(&config.chat))
            .context("failed to build text generator")?,
    );

    let orchestrator = Orchestrator::new(&config, fetcher, generator, artifacts, knowledge);
    let state = toolshed_api::ApiState::new(orchestrator);

    toolshed_api::serve(state, &config.server.bind, config.server.port, shutdown_signal()).await?;
    tracing::info!("toolshedd stopped");
    Ok(())
}

/// Missing or unreadable knowledge file → empty preamble.
fn load_knowledge(path: &std::path::Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            tracing::info!(path = %path.display(), bytes = text.len(), "knowledge base loaded");
            text
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "knowledge base unavailable, using empty context");
            String::new()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
