//! Handler for `GET /progress`: one-way progress event stream.
//!
//! Server-sent events of `{"progress": n}` frames. `-1` means "no update
//! yet, keep waiting"; the stream ends after a value of 100 is delivered.
//! One logical stream exists process-wide; values may be coalesced when
//! the client polls slower than the job publishes.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use benthos_events::{ProgressChannel, COMPLETE, NO_UPDATE};
use futures::stream::Stream;
use serde::Serialize;

use crate::state::AppState;

/// How long each poll waits for the next value before emitting `-1`.
const POLL_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct ProgressFrame {
    progress: i16,
}

fn frame_event(progress: i16) -> Event {
    let payload = serde_json::to_string(&ProgressFrame { progress })
        .unwrap_or_else(|_| format!("{{\"progress\":{progress}}}"));
    Event::default().data(payload)
}

/// GET /progress -- stream progress frames until completion.
pub async fn progress_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let channel = Arc::clone(&state.progress);
    Sse::new(frames(channel)).keep_alive(KeepAlive::default())
}

/// The frame sequence: short bounded waits against the channel, terminating
/// after the completion value has been emitted.
fn frames(channel: Arc<ProgressChannel>) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold((channel, false), |(channel, done)| async move {
        if done {
            return None;
        }
        let (value, now_done) = match channel.next(POLL_WINDOW).await {
            Some(v) => (i16::from(v), v >= COMPLETE),
            None => (NO_UPDATE, false),
        };
        Some((Ok(frame_event(value)), (channel, now_done)))
    })
}
