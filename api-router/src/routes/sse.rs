use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::api_state::ApiState;

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>>;
type SseResponse = Sse<KeepAliveStream<EventStream>>;

/// `GET /api/sse/logs` (§6): the current [`common::signal::SignalLog`]
/// tail followed by a live stream of subsequent entries, mirroring how
/// the teacher streams chat responses over SSE with `async-stream`.
pub async fn signal_log_stream(State(state): State<ApiState>) -> SseResponse {
    let (snapshot, mut receiver) = state.signal_log.snapshot_and_subscribe();

    let event_stream: EventStream = Box::pin(stream! {
        for entry in snapshot {
            yield Ok(Event::default().json_data(entry).unwrap_or_else(|_| Event::default()));
        }

        loop {
            match receiver.recv().await {
                Ok(entry) => yield Ok(Event::default().json_data(entry).unwrap_or_else(|_| Event::default())),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}
