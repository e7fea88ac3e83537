//! Main Entrypoint for the Shewit API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading the agent prompt templates.
//! 3. Building the LLM-backed agent gateway for the configured provider.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::{Context, bail};
use async_openai::config::OpenAIConfig;
use shewit_api::{config::Config, router::create_router, state::AppState};
use shewit_core::{AgentGateway, llm_gateway::LLMAgentGateway, prompt};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Load Prompts ---
    let prompts = prompt::load_dir(&config.prompts_path)?;
    if let Some(key) = prompt::missing_key(&prompts) {
        bail!(
            "{key}.md not found in prompts directory '{}'",
            config.prompts_path.display()
        );
    }
    info!(count = prompts.len(), "Prompt templates loaded.");

    // --- 4. Initialize the Agent Gateway ---
    info!(provider = ?config.provider, "Using {:?} provider.", config.provider);
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.api_key)
        .with_api_base(config.provider.api_base());
    let gateway: Arc<dyn AgentGateway> = Arc::new(LLMAgentGateway::new(
        openai_config,
        config.chat_model.clone(),
        prompts,
    ));

    let app_state = Arc::new(AppState::new(gateway));

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
