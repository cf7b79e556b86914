//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, DomainrAdapter, LibsqlAdapter, OpenAiAgentExecutor},
    config::{Config, DatabaseTarget},
    error::ApiError,
    tools::CheckDomainTool,
    web::{api_router, cors_layer, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::Router;
use idea_namer_core::ports::{DatabaseService, Tool};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let db: Arc<dyn DatabaseService> = match &config.database {
        DatabaseTarget::Remote { url, auth_token } => {
            info!("Connecting to remote database: {}", url);
            let adapter = LibsqlAdapter::new(url, auth_token.clone());
            adapter.run_migrations().await?;
            Arc::new(adapter)
        }
        DatabaseTarget::Local { path } => {
            info!("Connecting to local SQLite database: {}", path.display());
            let adapter = DbAdapter::connect_file(path).await?;
            info!("Running database migrations...");
            adapter.run_migrations().await?;
            Arc::new(adapter)
        }
    };
    info!("Database connected and migrated successfully.");

    // --- 3. Initialize Service Adapters ---
    let llm_config = OpenAIConfig::new()
        .with_api_key(&config.llm_api_key)
        .with_api_base(&config.llm_api_base);
    let agent = Arc::new(OpenAiAgentExecutor::new(
        Client::with_config(llm_config),
        config.agent_model.clone(),
        config.agent_max_iterations,
    ));

    let domain_lookup = Arc::new(DomainrAdapter::new(
        reqwest::Client::new(),
        &config.domainr_base_url,
        config.rapidapi_key.clone(),
    ));
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(CheckDomainTool::new(domain_lookup))];

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db.clone(),
        agent,
        tools,
    });

    let cors = cors_layer(&config.cors_allowed_origin)?;

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 7. Release the Database ---
    info!("Server stopped. Closing database...");
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
