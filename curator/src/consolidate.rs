use std::time::{Duration, Instant};

use ai_gateway::{AiGateway, AiProvider, GenerateOpts};
use common::error::AppError;
use common::signal::SignalLog;
use common::storage::db::SurrealDbClient;
use common::storage::types::memory::{Memory, MemoryStatus};
use common::storage::types::memory_vector::{MemoryVector, VectorMetadata};
use tracing::{instrument, warn};

/// Similar-memory fan-out (`topK`) per candidate.
const SIMILAR_TOP_K: usize = 3;

const CURATOR_SYSTEM_PROMPT: &str = "You are a memory curator. Merge these memories accurately.";

/// Operator-tunable knobs for a consolidation pass, sourced from
/// [`common::utils::config::AppConfig`] rather than hardcoded so a
/// deployment can widen the batch or tighten the per-call timeout
/// without a rebuild.
#[derive(Debug, Clone, Copy)]
pub struct CuratorLimits {
    /// Candidate batch size (W) per spec.md §4.3.
    pub batch_size: usize,
    /// Maximum consolidations performed in a single `run_once` call (K).
    pub max_consolidations: usize,
    /// Per-call timeout applied to every AI and store round trip.
    pub provider_timeout: Duration,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CuratorReport {
    pub candidates_examined: usize,
    pub consolidated: usize,
    pub processed: usize,
    pub errors: usize,
}

/// Runs one consolidation pass over up to `limits.batch_size` raw
/// memories (§4.3). Stops early once `deadline` has passed or
/// `limits.max_consolidations` merges have been performed; never chains
/// into a second batch within the same call. Every candidate's failure is
/// caught and logged — the loop always continues to the next candidate.
#[instrument(skip(db, gateway, signal_log))]
pub async fn run_once(
    deadline: Instant,
    similarity_threshold: f32,
    limits: CuratorLimits,
    db: &SurrealDbClient,
    gateway: &dyn AiGateway,
    signal_log: &SignalLog,
) -> Result<CuratorReport, AppError> {
    let candidates = with_timeout(limits.provider_timeout, Memory::fetch_raw_batch(limits.batch_size, db)).await?;
    let mut report = CuratorReport::default();

    for candidate in candidates {
        if Instant::now() >= deadline {
            signal_log.info("curator deadline reached, stopping batch early".to_string());
            break;
        }
        if report.consolidated >= limits.max_consolidations {
            signal_log.info("curator consolidation cap reached, stopping batch early".to_string());
            break;
        }

        report.candidates_examined += 1;
        match consolidate_candidate(&candidate, similarity_threshold, limits, db, gateway).await {
            Ok(true) => {
                report.consolidated += 1;
                signal_log.success(format!("consolidated memory {}", candidate.id));
            }
            Ok(false) => {
                report.processed += 1;
            }
            Err(err) => {
                report.errors += 1;
                warn!(memory_id = %candidate.id, error = %err, "curator candidate failed");
                signal_log.error(format!("curator candidate {} failed: {err}", candidate.id));
            }
        }
    }

    Ok(report)
}

/// Wraps a store call in the configured per-call timeout (§5), mapping a
/// timeout to the same transient classification a real network error
/// would get.
async fn with_timeout<F, T>(timeout: Duration, fut: F) -> Result<T, AppError>
where
    F: std::future::Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| AppError::TransientBackend("store call timed out".into()))?
}

/// Returns `Ok(true)` if `candidate` was consolidated with duplicates,
/// `Ok(false)` if it had none and was simply marked `processed`.
async fn consolidate_candidate(
    candidate: &Memory,
    similarity_threshold: f32,
    limits: CuratorLimits,
    db: &SurrealDbClient,
    gateway: &dyn AiGateway,
) -> Result<bool, AppError> {
    let opts = GenerateOpts {
        provider: AiProvider::Edge,
        timeout: limits.provider_timeout,
        ..GenerateOpts::default()
    };
    let timeout = limits.provider_timeout;

    let embedding = gateway.generate_embeddings(&candidate.text, &opts).await?;
    let similar = with_timeout(timeout, MemoryVector::query(&embedding, SIMILAR_TOP_K, db)).await?;

    let duplicate_ids: Vec<String> = similar
        .into_iter()
        .filter(|m| m.memory_id != candidate.id && m.score > similarity_threshold)
        .map(|m| m.memory_id)
        .collect();

    if duplicate_ids.is_empty() {
        with_timeout(
            timeout,
            Memory::update_text_and_status(&candidate.id, candidate.text.clone(), MemoryStatus::Processed, db),
        )
        .await?;
        return Ok(false);
    }

    let duplicates = with_timeout(timeout, Memory::get_by_ids(&duplicate_ids, db)).await?;
    let combined = std::iter::once(candidate.text.clone())
        .chain(duplicates.iter().map(|d| d.text.clone()))
        .collect::<Vec<_>>()
        .join("\n---\n");

    let consolidated = gateway
        .generate_text(&consolidation_prompt(&combined), CURATOR_SYSTEM_PROMPT, &opts)
        .await?;

    with_timeout(
        timeout,
        Memory::update_text_and_status(&candidate.id, consolidated.clone(), MemoryStatus::Consolidated, db),
    )
    .await?;

    let fresh_embedding = gateway.generate_embeddings(&consolidated, &opts).await?;
    let metadata = VectorMetadata::for_consolidation(candidate.created_at);
    with_timeout(
        timeout,
        MemoryVector::upsert(&candidate.id, &candidate.id, fresh_embedding, metadata, db),
    )
    .await?;

    for duplicate_id in &duplicate_ids {
        with_timeout(timeout, Memory::delete(duplicate_id, db)).await?;
        with_timeout(timeout, MemoryVector::delete(duplicate_id, db)).await?;
    }

    Ok(true)
}

fn consolidation_prompt(combined: &str) -> String {
    format!(
        "The following memories describe overlapping or duplicate information. Merge them into a \
         single memory that preserves every distinct fact and drops redundant phrasing.\n\n{combined}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_gateway::fake::FakeAiGateway;
    use common::utils::embedding::EMBEDDING_DIMENSION;
    use std::time::Duration;
    use uuid::Uuid;

    async fn test_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("failed to start in-memory surrealdb");
        db.ensure_initialized().await.expect("failed to init schema");
        db
    }

    fn unit_vec(seed: f32) -> Vec<f32> {
        let mut v = vec![0.0_f32; EMBEDDING_DIMENSION];
        v[0] = seed;
        v
    }

    fn test_limits() -> CuratorLimits {
        CuratorLimits {
            batch_size: 20,
            max_consolidations: 10,
            provider_timeout: Duration::from_secs(30),
        }
    }

    async fn seed_memory(db: &SurrealDbClient, id: &str, text: &str, seed: f32) {
        let memory = Memory::new(id.into(), text.into(), vec![], None, None);
        Memory::insert(memory, db).await.unwrap();
        MemoryVector::upsert(
            id,
            id,
            unit_vec(seed),
            VectorMetadata::for_ingestion(chrono::Utc::now(), &[]),
            db,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn candidate_without_duplicates_is_marked_processed() {
        let db = test_db().await;
        seed_memory(&db, "lonely", "a unique memory", 0.5).await;

        let gateway = FakeAiGateway::new(EMBEDDING_DIMENSION);
        let signal_log = SignalLog::new();
        let deadline = Instant::now() + Duration::from_secs(60);

        let report = run_once(deadline, 0.92, test_limits(), &db, &gateway, &signal_log).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.consolidated, 0);

        let memories = Memory::get_by_ids(&["lonely".into()], &db).await.unwrap();
        assert_eq!(memories[0].status, MemoryStatus::Processed);
    }

    #[tokio::test]
    async fn near_duplicates_consolidate_into_the_anchor() {
        let db = test_db().await;
        seed_memory(&db, "anchor", "likes espresso", 0.9).await;
        seed_memory(&db, "dup", "prefers espresso", 0.9).await;

        let gateway = FakeAiGateway::new(EMBEDDING_DIMENSION);
        let signal_log = SignalLog::new();
        let deadline = Instant::now() + Duration::from_secs(60);

        let report = run_once(deadline, 0.5, test_limits(), &db, &gateway, &signal_log).await.unwrap();
        assert_eq!(report.consolidated, 1);

        let anchor = Memory::get_by_ids(&["anchor".into()], &db).await.unwrap();
        assert_eq!(anchor.len(), 1);
        assert_eq!(anchor[0].status, MemoryStatus::Consolidated);

        let dup = Memory::get_by_ids(&["dup".into()], &db).await.unwrap();
        assert!(dup.is_empty());
    }

    #[tokio::test]
    async fn deadline_stops_batch_early() {
        let db = test_db().await;
        seed_memory(&db, "a", "memory a", 0.1).await;
        seed_memory(&db, "b", "memory b", 0.2).await;

        let gateway = FakeAiGateway::new(EMBEDDING_DIMENSION);
        let signal_log = SignalLog::new();
        let already_passed = Instant::now() - Duration::from_secs(1);

        let report = run_once(already_passed, 0.92, test_limits(), &db, &gateway, &signal_log).await.unwrap();
        assert_eq!(report.candidates_examined, 0);
    }
}
