use common::error::AppError;
use common::queue::QueueEnvelope;
use tokio::sync::mpsc;

/// The ingestion queue's front door (C4). A thin wrapper over an
/// `mpsc::Sender`, standing in for a real broker's publish call — the
/// pluggable seam documented alongside [`super::consumer::IngestionConsumer`].
#[derive(Clone)]
pub struct IngestionFrontDoor {
    sender: mpsc::Sender<QueueEnvelope>,
}

impl IngestionFrontDoor {
    pub fn new(sender: mpsc::Sender<QueueEnvelope>) -> Self {
        Self { sender }
    }

    /// Validates, stamps and enqueues `envelope`, returning as soon as it
    /// is queued — never waits on embedding or storage, so a slow
    /// downstream consumer cannot block the caller.
    pub async fn submit(&self, envelope: QueueEnvelope) -> Result<(), AppError> {
        if envelope.text.trim().is_empty() {
            return Err(AppError::InvalidInput("memory text must not be empty".into()));
        }

        self.sender
            .send(envelope)
            .await
            .map_err(|_| AppError::InternalError("ingestion queue receiver dropped".into()))
    }
}

/// Builds a bound front door / consumer channel pair. `capacity` bounds
/// how many envelopes can sit queued before `submit` starts applying
/// backpressure to callers.
pub fn channel(capacity: usize) -> (IngestionFrontDoor, mpsc::Receiver<QueueEnvelope>) {
    let (tx, rx) = mpsc::channel(capacity);
    (IngestionFrontDoor::new(tx), rx)
}
