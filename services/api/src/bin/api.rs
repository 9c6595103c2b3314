//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        chat::build_client, DbAdapter, OpenAiClassifierAdapter, OpenAiQuestionAdapter,
        OpenAiSummaryAdapter,
    },
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

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
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Generation Adapters ---
    let api_key = config
        .openai_api_key
        .as_deref()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let openai_client = build_client(Some(api_key), config.openai_api_base.as_deref());

    let classifier = Arc::new(OpenAiClassifierAdapter::new(
        openai_client.clone(),
        config.classify_model.clone(),
    ));
    let summarizer = Arc::new(OpenAiSummaryAdapter::new(
        openai_client.clone(),
        config.summary_model.clone(),
    ));
    let question_generator = Arc::new(OpenAiQuestionAdapter::new(
        openai_client,
        config.question_model.clone(),
    ));

    // --- 4. Build the Shared AppState and Router ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        classifier,
        summarizer,
        question_generator,
    });
    let app = router(app_state)?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
