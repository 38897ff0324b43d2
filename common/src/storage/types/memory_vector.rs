//! C2 Vector Store Adapter. Lives in its own table so the HNSW index can
//! be defined, rebuilt or re-dimensioned independently of the relational
//! [`super::memory::Memory`] row it mirrors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::error::AppError;
use crate::storage::db::SurrealDbClient;
use crate::stored_object;
use crate::utils::embedding::EMBEDDING_DIMENSION;

/// Opaque to the vector store beyond being returned alongside a match;
/// `priority_rank`/`primary_tag` are owned by the ingestion/curator
/// lifecycle (I5), not interpreted here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorMetadata {
    pub created_at: DateTime<Utc>,
    pub primary_tag: String,
    pub priority_rank: u8,
}

impl VectorMetadata {
    pub const RAW_PRIORITY_RANK: u8 = 0;
    pub const CONSOLIDATED_PRIORITY_RANK: u8 = 1;
    pub const CONSOLIDATED_TAG: &'static str = "consolidated";
    pub const DEFAULT_TAG: &'static str = "general";

    pub fn for_ingestion(created_at: DateTime<Utc>, context_tags: &[String]) -> Self {
        let primary_tag = context_tags
            .first()
            .cloned()
            .unwrap_or_else(|| Self::DEFAULT_TAG.to_string());
        Self {
            created_at,
            primary_tag,
            priority_rank: Self::RAW_PRIORITY_RANK,
        }
    }

    pub fn for_consolidation(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            primary_tag: Self::CONSOLIDATED_TAG.to_string(),
            priority_rank: Self::CONSOLIDATED_PRIORITY_RANK,
        }
    }
}

stored_object!(MemoryVector, "memory_vector", {
    memory_id: RecordId,
    embedding: Vec<f32>,
    metadata: VectorMetadata,
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorMatch {
    pub memory_id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

impl MemoryVector {
    /// HNSW ef search parameter; widened ef gives better recall at the
    /// cost of a larger candidate set per query.
    const SEARCH_EF: usize = 64;

    pub async fn upsert(
        id: &str,
        memory_id: &str,
        embedding: Vec<f32>,
        metadata: VectorMetadata,
        db: &SurrealDbClient,
    ) -> Result<MemoryVector, AppError> {
        if embedding.len() != EMBEDDING_DIMENSION {
            return Err(AppError::InvalidInput(format!(
                "embedding dimension {} does not match expected {}",
                embedding.len(),
                EMBEDDING_DIMENSION
            )));
        }

        let now = chrono::Utc::now();
        let record = MemoryVector {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            memory_id: RecordId::from_table_key("memory", memory_id),
            embedding,
            metadata,
        };

        db.client
            .upsert((Self::table_name(), id))
            .content(record)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::InternalError("upsert returned no record".into()))
    }

    /// Cosine-nearest neighbour search via the HNSW index's `<|k,ef|>` KNN
    /// operator, ordered by descending similarity score.
    pub async fn query(
        embedding: &[f32],
        top_k: usize,
        db: &SurrealDbClient,
    ) -> Result<Vec<VectorMatch>, AppError> {
        let ef = Self::SEARCH_EF.max(top_k);
        let mut response = db
            .client
            .query(format!(
                "SELECT memory_id, metadata, vector::similarity::cosine(embedding, $embedding) AS score \
                 FROM {} WHERE embedding <|{top_k},{ef}|> $embedding ORDER BY score DESC",
                Self::table_name()
            ))
            .bind(("embedding", embedding.to_vec()))
            .await
            .map_err(AppError::Database)?;

        #[derive(Deserialize)]
        struct Row {
            memory_id: RecordId,
            score: f32,
            metadata: VectorMetadata,
        }

        let rows: Vec<Row> = response.take(0).map_err(AppError::Database)?;
        Ok(rows
            .into_iter()
            .map(|row| VectorMatch {
                memory_id: row.memory_id.key().to_string(),
                score: row.score,
                metadata: row.metadata,
            })
            .collect())
    }

    pub async fn delete(id: &str, db: &SurrealDbClient) -> Result<Option<MemoryVector>, AppError> {
        db.delete_item::<MemoryVector>(id)
            .await
            .map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn unit_vec(seed: f32) -> Vec<f32> {
        let mut v = vec![0.0_f32; EMBEDDING_DIMENSION];
        v[0] = seed;
        v[1] = 1.0 - seed;
        v
    }

    fn metadata() -> VectorMetadata {
        VectorMetadata::for_ingestion(chrono::Utc::now(), &[])
    }

    async fn test_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("failed to start in-memory surrealdb");
        db.ensure_initialized().await.expect("failed to init schema");
        db
    }

    #[tokio::test]
    async fn rejects_wrong_dimension() {
        let db = test_db().await;
        let result = MemoryVector::upsert("v1", "m1", vec![0.0; 4], metadata(), &db).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn upsert_and_query_returns_nearest() {
        let db = test_db().await;
        MemoryVector::upsert("v1", "m1", unit_vec(0.9), metadata(), &db)
            .await
            .unwrap();
        MemoryVector::upsert("v2", "m2", unit_vec(0.1), metadata(), &db)
            .await
            .unwrap();

        let matches = MemoryVector::query(&unit_vec(0.9), 1, &db).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].memory_id, "m1");
        assert_eq!(matches[0].metadata.primary_tag, VectorMetadata::DEFAULT_TAG);
    }

    #[tokio::test]
    async fn delete_removes_vector() {
        let db = test_db().await;
        MemoryVector::upsert("v1", "m1", unit_vec(0.5), metadata(), &db)
            .await
            .unwrap();

        let deleted = MemoryVector::delete("v1", &db).await.unwrap();
        assert!(deleted.is_some());
    }
}
