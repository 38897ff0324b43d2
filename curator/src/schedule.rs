use std::sync::Arc;
use std::time::{Duration, Instant};

use ai_gateway::AiGateway;
use common::signal::SignalLog;
use common::storage::db::SurrealDbClient;
use tokio::time::interval;
use tracing::{error, info};

use crate::consolidate::{run_once, CuratorLimits};

/// Drives [`run_once`] on a fixed cadence (nominally daily). `interval`
/// and `candidate_deadline` are both configuration-driven so tests and
/// the manual `trigger-curator` endpoint can run the identical code path
/// with a tight deadline.
pub async fn run_scheduled(
    tick: Duration,
    candidate_deadline: Duration,
    similarity_threshold: f32,
    limits: CuratorLimits,
    db: Arc<SurrealDbClient>,
    gateway: Arc<dyn AiGateway>,
    signal_log: Arc<SignalLog>,
) {
    let mut ticker = interval(tick);
    loop {
        ticker.tick().await;
        run_and_log(candidate_deadline, similarity_threshold, limits, &db, gateway.as_ref(), &signal_log).await;
    }
}

/// Runs one pass out of band, used by the manual `trigger-curator` HTTP
/// route via `tokio::spawn` so the request returns immediately.
pub async fn trigger_once(
    candidate_deadline: Duration,
    similarity_threshold: f32,
    limits: CuratorLimits,
    db: Arc<SurrealDbClient>,
    gateway: Arc<dyn AiGateway>,
    signal_log: Arc<SignalLog>,
) {
    run_and_log(candidate_deadline, similarity_threshold, limits, &db, gateway.as_ref(), &signal_log).await;
}

async fn run_and_log(
    candidate_deadline: Duration,
    similarity_threshold: f32,
    limits: CuratorLimits,
    db: &SurrealDbClient,
    gateway: &dyn AiGateway,
    signal_log: &SignalLog,
) {
    let deadline = Instant::now() + candidate_deadline;
    match run_once(deadline, similarity_threshold, limits, db, gateway, signal_log).await {
        Ok(report) => info!(
            consolidated = report.consolidated,
            processed = report.processed,
            errors = report.errors,
            "curator pass finished"
        ),
        Err(err) => error!(error = %err, "curator pass failed to run"),
    }
}
