use std::sync::Arc;
use std::time::Duration;

use ai_gateway::AiGateway;
use common::signal::SignalLog;
use common::storage::db::SurrealDbClient;
use common::utils::config::AppConfig;
use curator::consolidate::CuratorLimits;
use ingestion_pipeline::IngestionFrontDoor;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub gateway: Arc<dyn AiGateway>,
    pub signal_log: Arc<SignalLog>,
    pub front_door: IngestionFrontDoor,
    pub similarity_threshold: f32,
    pub curator_deadline: Duration,
    pub curator_limits: CuratorLimits,
    pub provider_timeout: Duration,
}

impl ApiState {
    pub fn new(
        db: Arc<SurrealDbClient>,
        gateway: Arc<dyn AiGateway>,
        signal_log: Arc<SignalLog>,
        front_door: IngestionFrontDoor,
        config: &AppConfig,
    ) -> Self {
        let provider_timeout = Duration::from_secs(config.provider_call_timeout_secs);
        Self {
            db,
            gateway,
            signal_log,
            front_door,
            similarity_threshold: config.similarity_threshold,
            curator_deadline: Duration::from_secs(config.curator_deadline_secs),
            curator_limits: CuratorLimits {
                batch_size: config.curator_batch_size,
                max_consolidations: config.curator_max_consolidations,
                provider_timeout,
            },
            provider_timeout,
        }
    }
}
