use std::{
    ops::Deref,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use futures::Stream;
use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Notification, Surreal,
};

use crate::error::AppError;
use crate::utils::embedding::EMBEDDING_DIMENSION;

use super::types::{memory::Memory, memory_vector::MemoryVector, StoredObject};

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
    /// Countdown of injected relational-insert failures, used by
    /// `Memory::insert` to simulate a transient store outage in tests.
    /// Always zero outside of tests, so it costs one atomic load on the
    /// happy path.
    fail_next_memory_inserts: Arc<AtomicU32>,
}

pub trait ProvidesDb {
    fn db(&self) -> &Arc<SurrealDbClient>;
}

impl SurrealDbClient {
    /// Connect, authenticate and select the working namespace/database.
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        if !username.is_empty() {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient {
            client: db,
            fail_next_memory_inserts: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Consumes one injected failure if any are pending, for
    /// `Memory::insert` to check before attempting a real write.
    pub fn take_injected_memory_insert_failure(&self) -> bool {
        let mut current = self.fail_next_memory_inserts.load(Ordering::SeqCst);
        loop {
            if current == 0 {
                return false;
            }
            match self.fail_next_memory_inserts.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub async fn ensure_initialized(&self) -> Result<(), AppError> {
        self.build_indexes().await?;
        Ok(())
    }

    pub async fn build_indexes(&self) -> Result<(), AppError> {
        self.client
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS idx_embedding_memory_vector ON TABLE {} FIELDS embedding HNSW DIMENSION {EMBEDDING_DIMENSION}",
                MemoryVector::table_name()
            ))
            .await
            .map_err(AppError::Database)?;

        self.client
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS idx_memory_session ON TABLE {} FIELDS session_id;
                 DEFINE INDEX IF NOT EXISTS idx_memory_source ON TABLE {table} FIELDS source_app;
                 DEFINE INDEX IF NOT EXISTS idx_memory_created ON TABLE {table} FIELDS created_at;
                 DEFINE INDEX IF NOT EXISTS idx_memory_status ON TABLE {table} FIELDS status;",
                Memory::table_name(),
                table = Memory::table_name(),
            ))
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn rebuild_indexes(&self) -> Result<(), AppError> {
        self.client
            .query(format!(
                "REBUILD INDEX IF EXISTS idx_embedding_memory_vector ON {}",
                MemoryVector::table_name()
            ))
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    pub async fn get_all_stored_items<T>(&self) -> Result<Vec<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select(T::table_name()).await
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }

    pub async fn delete_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.delete((T::table_name(), id)).await
    }

    pub async fn listen<T>(
        &self,
    ) -> Result<impl Stream<Item = Result<Notification<T>, Error>>, Error>
    where
        T: for<'de> StoredObject + std::marker::Unpin,
    {
        self.client.select(T::table_name()).live().await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient {
            client: db,
            fail_next_memory_inserts: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Makes the next `count` calls to `Memory::insert` fail with a
    /// transient error, to exercise the ingestion consumer's retry path.
    pub fn fail_next_memory_inserts(&self, count: u32) {
        self.fail_next_memory_inserts.store(count, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use crate::stored_object;

    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    stored_object!(Dummy, "dummy", {
        name: String
    });

    #[tokio::test]
    async fn test_initialization_and_crud() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to start in-memory surrealdb");

        db.ensure_initialized()
            .await
            .expect("failed to initialize schema");

        let dummy = Dummy {
            id: "abc".to_string(),
            name: "first".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let stored = db.store_item(dummy.clone()).await.expect("failed to store");
        assert!(stored.is_some());

        let fetched = db
            .get_item::<Dummy>(&dummy.id)
            .await
            .expect("failed to fetch");
        assert_eq!(fetched, Some(dummy.clone()));

        let all = db
            .get_all_stored_items::<Dummy>()
            .await
            .expect("failed to fetch all");
        assert!(all.contains(&dummy));

        let deleted = db
            .delete_item::<Dummy>(&dummy.id)
            .await
            .expect("failed to delete");
        assert_eq!(deleted, Some(dummy));

        let fetch_post = db
            .get_item::<Dummy>("abc")
            .await
            .expect("failed fetch post delete");
        assert!(fetch_post.is_none());
    }

    #[tokio::test]
    async fn test_build_indexes() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to start in-memory surrealdb");

        db.build_indexes().await.expect("failed to build indexes");
    }
}
