//! C3 Memory Store Adapter: the relational half of a memory. Holds the
//! text, its provenance and its lifecycle status. The embedding lives
//! separately in [`super::memory_vector::MemoryVector`] so the vector
//! index can be rebuilt or re-dimensioned without touching this table.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::storage::db::SurrealDbClient;
use crate::stored_object;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    #[default]
    Raw,
    Consolidated,
    Processed,
}

stored_object!(Memory, "memory", {
    text: String,
    tags: Vec<String>,
    source_app: Option<String>,
    session_id: Option<String>,
    status: MemoryStatus,
});

impl Memory {
    pub fn new(
        id: String,
        text: String,
        tags: Vec<String>,
        source_app: Option<String>,
        session_id: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Memory {
            id,
            created_at: now,
            updated_at: now,
            text,
            tags,
            source_app,
            session_id,
            status: MemoryStatus::Raw,
        }
    }

    pub async fn insert(memory: Memory, db: &SurrealDbClient) -> Result<Memory, AppError> {
        if db.take_injected_memory_insert_failure() {
            return Err(AppError::TransientBackend(
                "injected relational insert failure".into(),
            ));
        }

        db.store_item(memory)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::InternalError("insert returned no record".into()))
    }

    pub async fn get_by_ids(ids: &[String], db: &SurrealDbClient) -> Result<Vec<Memory>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut response = db
            .client
            .query("SELECT * FROM type::table($table) WHERE id IN $ids")
            .bind(("table", Self::table_name().to_string()))
            .bind((
                "ids",
                ids.iter()
                    .map(|id| surrealdb::RecordId::from_table_key(Self::table_name(), id.as_str()))
                    .collect::<Vec<_>>(),
            ))
            .await
            .map_err(AppError::Database)?;

        response.take(0).map_err(AppError::Database)
    }

    pub async fn update_text_and_status(
        id: &str,
        text: String,
        status: MemoryStatus,
        db: &SurrealDbClient,
    ) -> Result<Option<Memory>, AppError> {
        db.client
            .query(
                "UPDATE type::thing($table, $id) SET text = $text, status = $status, updated_at = time::now()",
            )
            .bind(("table", Self::table_name().to_string()))
            .bind(("id", id.to_string()))
            .bind(("text", text))
            .bind(("status", status))
            .await
            .map_err(AppError::Database)?
            .take(0)
            .map_err(AppError::Database)
    }

    pub async fn delete(id: &str, db: &SurrealDbClient) -> Result<Option<Memory>, AppError> {
        db.delete_item::<Memory>(id).await.map_err(AppError::Database)
    }

    /// Candidate fetch for the curator: the oldest `Raw` memories, bounded
    /// at `limit` so a consolidation pass has a fixed, fair window.
    pub async fn fetch_raw_batch(limit: usize, db: &SurrealDbClient) -> Result<Vec<Memory>, AppError> {
        db.client
            .query("SELECT * FROM type::table($table) WHERE status = $status ORDER BY created_at ASC LIMIT $limit")
            .bind(("table", Self::table_name().to_string()))
            .bind(("status", MemoryStatus::Raw))
            .bind(("limit", limit))
            .await
            .map_err(AppError::Database)?
            .take(0)
            .map_err(AppError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_db() -> SurrealDbClient {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("failed to start in-memory surrealdb");
        db.ensure_initialized().await.expect("failed to init schema");
        db
    }

    #[tokio::test]
    async fn insert_and_fetch_by_ids() {
        let db = test_db().await;
        let memory = Memory::new(
            Uuid::new_v4().to_string(),
            "remember the milk".into(),
            vec!["todo".into()],
            Some("cli".into()),
            None,
        );
        let inserted = Memory::insert(memory.clone(), &db).await.unwrap();
        assert_eq!(inserted.text, "remember the milk");

        let fetched = Memory::get_by_ids(&[memory.id.clone()], &db).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, memory.id);
    }

    #[tokio::test]
    async fn fetch_raw_batch_respects_limit_and_status() {
        let db = test_db().await;
        for i in 0..5 {
            let memory = Memory::new(
                Uuid::new_v4().to_string(),
                format!("memory {i}"),
                vec![],
                None,
                None,
            );
            Memory::insert(memory, &db).await.unwrap();
        }

        let batch = Memory::fetch_raw_batch(3, &db).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|m| m.status == MemoryStatus::Raw));
    }

    #[tokio::test]
    async fn update_text_and_status_persists() {
        let db = test_db().await;
        let memory = Memory::new(Uuid::new_v4().to_string(), "original".into(), vec![], None, None);
        let memory = Memory::insert(memory, &db).await.unwrap();

        let updated = Memory::update_text_and_status(
            &memory.id,
            "consolidated text".into(),
            MemoryStatus::Consolidated,
            &db,
        )
        .await
        .unwrap()
        .expect("expected updated record");

        assert_eq!(updated.text, "consolidated text");
        assert_eq!(updated.status, MemoryStatus::Consolidated);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let db = test_db().await;
        let memory = Memory::new(Uuid::new_v4().to_string(), "to delete".into(), vec![], None, None);
        let memory = Memory::insert(memory, &db).await.unwrap();

        let deleted = Memory::delete(&memory.id, &db).await.unwrap();
        assert!(deleted.is_some());

        let fetched = Memory::get_by_ids(&[memory.id], &db).await.unwrap();
        assert!(fetched.is_empty());
    }
}
