use std::sync::Arc;
use std::time::Duration;

use ai_gateway::{AiGateway, DefaultAiGateway};
use common::{
    signal::SignalLog, storage::db::SurrealDbClient, utils::config::get_config,
    utils::embedding::EmbeddingProvider,
};
use curator::consolidate::CuratorLimits;
use curator::schedule::run_scheduled;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

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

    // Ingestion is drained in-process by the `server` binary (the mpsc
    // front door does not cross process boundaries); this worker's sole
    // job is the scheduled curator pass (§4.3).
    let limits = CuratorLimits {
        batch_size: config.curator_batch_size,
        max_consolidations: config.curator_max_consolidations,
        provider_timeout: Duration::from_secs(config.provider_call_timeout_secs),
    };

    run_scheduled(
        Duration::from_secs(config.curator_interval_secs),
        Duration::from_secs(config.curator_deadline_secs),
        config.similarity_threshold,
        limits,
        db,
        gateway,
        signal_log,
    )
    .await;

    Ok(())
}
