//! agora-ai - AI Enrichment Microservice
//!
//! Generates AI titles for RSS articles, derives debate issue cards from
//! articles and community posts, and proposes votes for approved issues.
//! Two background dispatchers drain the trigger queues; the HTTP API serves
//! the title batch, single-item issue generation and health checks.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agora_ai::config::{resolve_openai_api_key, TomlConfig};
use agora_ai::engine::Engine;
use agora_ai::generation::OpenAiGenerator;
use agora_ai::queue::SqliteWorkQueue;
use agora_ai::services::HttpVoteClient;
use agora_ai::worker::{run_issue_worker, run_vote_worker};
use agora_ai::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting agora-ai (AI Enrichment) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = TomlConfig::config_path();
    let config = TomlConfig::load(&config_path)?;

    let db_pool = agora_ai::db::init_database_pool(Path::new(&config.database_path)).await?;
    info!("Database connection established");

    let api_key = resolve_openai_api_key(&db_pool, &config).await?;

    let generator = Arc::new(OpenAiGenerator::new(
        &config.openai_base_url,
        config.openai_model.clone(),
        api_key,
    ));
    let vote_client = Arc::new(HttpVoteClient::new(config.vote_api_base_url.clone()));
    let engine = Arc::new(Engine::new(db_pool.clone(), generator, vote_client));

    let queue = Arc::new(SqliteWorkQueue::new(db_pool.clone()));
    tokio::spawn(run_issue_worker(engine.clone(), queue.clone()));
    tokio::spawn(run_vote_worker(engine.clone(), queue));
    info!("Queue dispatchers started");

    let state = AppState::new(db_pool, engine);
    let app = agora_ai::build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
