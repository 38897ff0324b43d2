//! Process-local append-only operational log (C8).
//!
//! Bounded to the last `CAPACITY` entries in memory; not persisted across
//! restarts. Subscribers get the current tail and then live appends via a
//! broadcast channel, mirroring how the teacher exposes live table updates
//! through `SurrealDbClient::listen`.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CAPACITY: usize = 50;
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Process,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
}

pub struct SignalLog {
    ring: Mutex<VecDeque<LogEntry>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<LogEntry>,
}

impl SignalLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            ring: Mutex::new(VecDeque::with_capacity(CAPACITY)),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    fn push_at(&self, kind: LogKind, message: impl Into<String>, timestamp: DateTime<Utc>) {
        let entry = LogEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp,
            kind,
            message: message.into(),
        };

        {
            let mut ring = self.ring.lock().unwrap_or_else(|poison| poison.into_inner());
            if ring.len() == CAPACITY {
                ring.pop_front();
            }
            ring.push_back(entry.clone());
        }

        // No subscribers is not an error; the entry is still retained in the ring.
        let _ = self.sender.send(entry);
    }

    pub fn push(&self, kind: LogKind, message: impl Into<String>) {
        self.push_at(kind, message, Utc::now());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(LogKind::Success, message);
    }

    pub fn process(&self, message: impl Into<String>) {
        self.push(LogKind::Process, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogKind::Error, message);
    }

    /// Current tail plus a receiver for subsequent live appends.
    pub fn snapshot_and_subscribe(&self) -> (Vec<LogEntry>, broadcast::Receiver<LogEntry>) {
        let receiver = self.sender.subscribe();
        let ring = self.ring.lock().unwrap_or_else(|poison| poison.into_inner());
        (ring.iter().cloned().collect(), receiver)
    }
}

impl Default for SignalLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_is_bounded_to_capacity() {
        let log = SignalLog::new();
        for i in 0..(CAPACITY + 10) {
            log.info(format!("entry {i}"));
        }
        let (snapshot, _rx) = log.snapshot_and_subscribe();
        assert_eq!(snapshot.len(), CAPACITY);
        assert_eq!(snapshot.first().unwrap().message, "entry 10");
        assert_eq!(snapshot.last().unwrap().message, format!("entry {}", CAPACITY + 9));
    }

    #[tokio::test]
    async fn subscribers_receive_live_appends() {
        let log = SignalLog::new();
        log.info("before subscribe");
        let (snapshot, mut rx) = log.snapshot_and_subscribe();
        assert_eq!(snapshot.len(), 1);

        log.success("after subscribe");
        let received = rx.recv().await.expect("broadcast channel closed");
        assert_eq!(received.message, "after subscribe");
        assert_eq!(received.kind, LogKind::Success);
    }
}
