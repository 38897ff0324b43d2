use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use ai_gateway::{AiGateway, AiProvider, GenerateOpts};
use common::error::AppError;
use common::storage::db::SurrealDbClient;
use common::storage::types::memory::Memory;
use common::storage::types::memory_vector::MemoryVector;
use tracing::instrument;

use crate::types::ScoredMemory;

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

/// Embed → vector query → relational hydrate → score-ordered merge
/// (§4.2.1). Memories whose id is absent from the relational store are
/// dropped as vector/metadata orphans rather than surfaced half-formed.
#[instrument(skip(gateway, db))]
pub async fn basic_search(
    query: &str,
    limit: usize,
    provider_timeout: Duration,
    gateway: &dyn AiGateway,
    db: &SurrealDbClient,
) -> Result<Vec<ScoredMemory>, AppError> {
    let opts = GenerateOpts {
        provider: AiProvider::Edge,
        timeout: provider_timeout,
        ..GenerateOpts::default()
    };
    let embedding = gateway.generate_embeddings(query, &opts).await?;
    let matches = with_timeout(provider_timeout, MemoryVector::query(&embedding, limit, db)).await?;

    if matches.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = matches.iter().map(|m| m.memory_id.clone()).collect();
    let rows = with_timeout(provider_timeout, Memory::get_by_ids(&ids, db)).await?;
    let rows_by_id: HashMap<&str, &Memory> = rows.iter().map(|m| (m.id.as_str(), m)).collect();

    let mut scored: Vec<ScoredMemory> = matches
        .into_iter()
        .filter_map(|m| {
            rows_by_id.get(m.memory_id.as_str()).map(|row| ScoredMemory {
                memory: (*row).clone(),
                score: m.score,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
    });

    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_gateway::fake::FakeAiGateway;
    use common::storage::types::memory::Memory;
    use common::storage::types::memory_vector::VectorMetadata;
    use common::utils::embedding::EMBEDDING_DIMENSION;
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

    #[tokio::test]
    async fn orders_by_score_descending() {
        let db = test_db().await;
        for (id, seed) in [("a", 0.1), ("b", 0.9)] {
            let memory = Memory::new(id.into(), format!("memory {id}"), vec![], None, None);
            Memory::insert(memory, &db).await.unwrap();
            MemoryVector::upsert(
                id,
                id,
                unit_vec(seed),
                VectorMetadata::for_ingestion(chrono::Utc::now(), &[]),
                &db,
            )
            .await
            .unwrap();
        }

        let gateway = FakeAiGateway::new(EMBEDDING_DIMENSION);
        let results = basic_search("query", 10, Duration::from_secs(30), &gateway, &db).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn drops_orphaned_vector_matches() {
        let db = test_db().await;
        MemoryVector::upsert(
            "orphan",
            "orphan",
            unit_vec(0.5),
            VectorMetadata::for_ingestion(chrono::Utc::now(), &[]),
            &db,
        )
        .await
        .unwrap();

        let gateway = FakeAiGateway::new(EMBEDDING_DIMENSION);
        let results = basic_search("query", 10, Duration::from_secs(30), &gateway, &db).await.unwrap();
        assert!(results.is_empty());
    }
}
