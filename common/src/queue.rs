//! The ingestion queue envelope (§3). The front door and the consumer are
//! wired together by an `mpsc` channel carrying this type; swapping in a
//! real broker means swapping the sender/receiver pair for one backed by
//! it, without touching either side's logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ENVELOPE_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEnvelope {
    pub text: String,
    pub context_tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub source_app: Option<String>,
    pub session_id: Option<String>,
    pub version: u8,
}

impl QueueEnvelope {
    pub fn new(
        text: String,
        context_tags: Vec<String>,
        source_app: Option<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            text,
            context_tags,
            timestamp: Utc::now(),
            source_app,
            session_id,
            version: ENVELOPE_VERSION,
        }
    }
}
