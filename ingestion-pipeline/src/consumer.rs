use std::sync::Arc;
use std::time::Duration;

use ai_gateway::{AiGateway, AiProvider, GenerateOpts};
use common::error::AppError;
use common::queue::QueueEnvelope;
use common::signal::SignalLog;
use common::storage::db::SurrealDbClient;
use common::storage::types::memory::Memory;
use common::storage::types::memory_vector::{MemoryVector, VectorMetadata};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::retry::retry_delay;
use crate::state::ready;

pub struct IngestionConsumer {
    receiver: mpsc::Receiver<QueueEnvelope>,
    db: Arc<SurrealDbClient>,
    gateway: Arc<dyn AiGateway>,
    signal_log: Arc<SignalLog>,
    retry_attempts: u32,
    retry_base_delay: Duration,
    provider_timeout: Duration,
}

impl IngestionConsumer {
    pub fn new(
        receiver: mpsc::Receiver<QueueEnvelope>,
        db: Arc<SurrealDbClient>,
        gateway: Arc<dyn AiGateway>,
        signal_log: Arc<SignalLog>,
        retry_attempts: u32,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            receiver,
            db,
            gateway,
            signal_log,
            retry_attempts,
            retry_base_delay: Duration::from_millis(100),
            provider_timeout,
        }
    }

    /// Drains the queue forever, processing one envelope at a time. Each
    /// envelope's failure is isolated: it is logged and dropped, never
    /// aborting the loop for the rest of the queue.
    pub async fn run_loop(mut self) {
        while let Some(envelope) = self.receiver.recv().await {
            if let Err(err) = self.process(envelope).await {
                warn!(error = %err, "ingestion envelope failed permanently");
                self.signal_log
                    .error(format!("ingestion failed: {err}"));
            }
        }
    }

    /// Embed, vector-upsert and relationally-insert `envelope` as bounded
    /// retry over the whole sequence: a transient failure from any of the
    /// three stores re-runs the sequence from scratch against the same
    /// generated `id`, so the vector upsert and the duplicate-key guard on
    /// the relational insert keep a retried attempt idempotent.
    #[instrument(skip(self, envelope), fields(source_app = envelope.source_app.as_deref()))]
    async fn process(&self, envelope: QueueEnvelope) -> Result<(), AppError> {
        let id = Uuid::new_v4().to_string();

        let mut last_err = None;
        for attempt in 0..self.retry_attempts {
            match self.try_ingest(&id, &envelope).await {
                Ok(()) => {
                    self.signal_log.success(format!("ingested memory {id}"));
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt + 1 < self.retry_attempts => {
                    let delay = retry_delay(attempt, self.retry_base_delay);
                    warn!(attempt, delay_ms = %delay.as_millis(), error = %err, "retrying ingestion");
                    sleep(delay).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::InternalError("ingestion retries exhausted".into())))
    }

    async fn try_ingest(&self, id: &str, envelope: &QueueEnvelope) -> Result<(), AppError> {
        let machine = ready();
        let opts = GenerateOpts {
            provider: AiProvider::Edge,
            timeout: self.provider_timeout,
            ..GenerateOpts::default()
        };

        let embedding = self.gateway.generate_embeddings(&envelope.text, &opts).await?;
        let machine = machine
            .embed()
            .map_err(|(_, guard)| AppError::InternalError(format!("invalid transition: {guard:?}")))?;

        let metadata = VectorMetadata::for_ingestion(envelope.timestamp, &envelope.context_tags);
        tokio::time::timeout(
            self.provider_timeout,
            MemoryVector::upsert(id, id, embedding, metadata, &self.db),
        )
        .await
        .map_err(|_| AppError::TransientBackend("vector store call timed out".into()))??;

        let memory = Memory::new(
            id.to_string(),
            envelope.text.clone(),
            envelope.context_tags.clone(),
            envelope.source_app.clone(),
            envelope.session_id.clone(),
        );
        match tokio::time::timeout(self.provider_timeout, Memory::insert(memory, &self.db)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) if is_duplicate_key(&err) => {
                warn!(memory_id = %id, "duplicate memory insert treated as success");
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(AppError::TransientBackend("relational store call timed out".into())),
        }

        machine
            .persist()
            .map_err(|(_, guard)| AppError::InternalError(format!("invalid transition: {guard:?}")))?;

        Ok(())
    }
}

fn is_duplicate_key(err: &AppError) -> bool {
    matches!(err, AppError::Database(_)) && err.to_string().to_lowercase().contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_gateway::fake::FakeAiGateway;
    use common::utils::embedding::EMBEDDING_DIMENSION;
    use uuid::Uuid as TestUuid;

    async fn test_db() -> Arc<SurrealDbClient> {
        let db = SurrealDbClient::memory("test_ns", &TestUuid::new_v4().to_string())
            .await
            .expect("failed to start in-memory surrealdb");
        db.ensure_initialized().await.expect("failed to init schema");
        Arc::new(db)
    }

    fn provider_timeout() -> Duration {
        Duration::from_secs(30)
    }

    #[tokio::test]
    async fn processes_envelope_into_both_stores() {
        let db = test_db().await;
        let gateway: Arc<dyn AiGateway> = Arc::new(FakeAiGateway::new(EMBEDDING_DIMENSION));
        let (tx, rx) = mpsc::channel(4);
        let signal_log = Arc::new(SignalLog::new());
        let consumer = IngestionConsumer::new(rx, db.clone(), gateway, signal_log, 3, provider_timeout());

        tx.send(QueueEnvelope::new("hello memory".into(), vec![], None, None))
            .await
            .unwrap();
        drop(tx);

        consumer.run_loop().await;

        let memories = db.get_all_stored_items::<Memory>().await.unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].text, "hello memory");

        let vectors = db.get_all_stored_items::<MemoryVector>().await.unwrap();
        assert_eq!(vectors.len(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_does_not_abort_the_loop() {
        let db = test_db().await;
        let gateway: Arc<dyn AiGateway> = Arc::new(FakeAiGateway::failing());
        let (tx, rx) = mpsc::channel(4);
        let signal_log = Arc::new(SignalLog::new());
        let consumer = IngestionConsumer::new(rx, db.clone(), gateway, signal_log, 1, provider_timeout());

        tx.send(QueueEnvelope::new("will fail".into(), vec![], None, None))
            .await
            .unwrap();
        drop(tx);

        consumer.run_loop().await;

        let memories = db.get_all_stored_items::<Memory>().await.unwrap();
        assert!(memories.is_empty());
    }

    #[tokio::test]
    async fn transient_relational_insert_failure_is_retried_to_success() {
        let db = test_db().await;
        db.fail_next_memory_inserts(2);
        let gateway: Arc<dyn AiGateway> = Arc::new(FakeAiGateway::new(EMBEDDING_DIMENSION));
        let (tx, rx) = mpsc::channel(4);
        let signal_log = Arc::new(SignalLog::new());
        let consumer = IngestionConsumer::new(rx, db.clone(), gateway, signal_log, 3, provider_timeout());

        tx.send(QueueEnvelope::new("retried memory".into(), vec![], None, None))
            .await
            .unwrap();
        drop(tx);

        consumer.run_loop().await;

        let memories = db.get_all_stored_items::<Memory>().await.unwrap();
        assert_eq!(memories.len(), 1, "message should be acked exactly once after retries succeed");
        assert_eq!(memories[0].text, "retried memory");

        let vectors = db.get_all_stored_items::<MemoryVector>().await.unwrap();
        assert_eq!(vectors.len(), 1, "vector upsert is idempotent across retries");
    }

    #[tokio::test]
    async fn relational_insert_failures_exceeding_retry_budget_propagate() {
        let db = test_db().await;
        db.fail_next_memory_inserts(3);
        let gateway: Arc<dyn AiGateway> = Arc::new(FakeAiGateway::new(EMBEDDING_DIMENSION));
        let (tx, rx) = mpsc::channel(4);
        let signal_log = Arc::new(SignalLog::new());
        let consumer = IngestionConsumer::new(rx, db.clone(), gateway, signal_log, 3, provider_timeout());

        tx.send(QueueEnvelope::new("never lands".into(), vec![], None, None))
            .await
            .unwrap();
        drop(tx);

        consumer.run_loop().await;

        let memories = db.get_all_stored_items::<Memory>().await.unwrap();
        assert!(memories.is_empty());
    }
}
