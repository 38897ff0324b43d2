use std::sync::Arc;
use std::time::Duration;

use ai_gateway::{AiGateway, DefaultAiGateway};
use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    signal::SignalLog, storage::db::SurrealDbClient, utils::config::get_config,
    utils::embedding::EmbeddingProvider,
};
use ingestion_pipeline::{front_door, IngestionConsumer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const INGESTION_QUEUE_CAPACITY: usize = 256;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    // Set up router state
    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );
    db.ensure_initialized().await?;

    let embedding_provider = Arc::new(EmbeddingProvider::new()?);
    let gateway: Arc<dyn AiGateway> = Arc::new(DefaultAiGateway::new(
        embedding_provider,
        &config.edge_base_url,
        config.edge_api_key.as_deref(),
        config.edge_model.clone().unwrap_or_default(),
        &config.gemini_base_url,
        config.gemini_api_key.as_deref(),
        "gemini-2.0-flash",
        &config.openai_base_url,
        config.openai_api_key.as_deref(),
        "gpt-4o-mini",
    ));

    let signal_log = Arc::new(SignalLog::new());
    let (front_door, receiver) = front_door::channel(INGESTION_QUEUE_CAPACITY);

    // The server process also drives its own ingestion consumer so a
    // standalone deployment without a separate `worker` process still
    // drains submitted memories; running several `server` replicas simply
    // adds more consumers pulling from their own in-process channel.
    let consumer = IngestionConsumer::new(
        receiver,
        db.clone(),
        gateway.clone(),
        signal_log.clone(),
        config.ingestion_retry_attempts,
        Duration::from_secs(config.provider_call_timeout_secs),
    );
    tokio::spawn(consumer.run_loop());

    let api_state = ApiState::new(db, gateway, signal_log, front_door, &config);

    // Create Axum router
    let app = Router::new()
        .merge(api_routes_v1(&api_state))
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
