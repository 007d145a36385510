//! GET /void — the live feed, one broadcast loop per viewer.
//!
//! Flow per connection:
//! 1. Register the viewer and open an SSE response fed by a watch channel
//! 2. Spawn the loop: every tick, scan + evict the store, render, publish
//! 3. The watch channel keeps only the newest fragment, so a slow viewer
//!    skips stale frames instead of queueing them
//! 4. The loop closes when the viewer's stream is dropped or on shutdown

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::render::{merge_fragments_event, render_feed};
use crate::state::AppState;

/// Axum handler for GET /void — opens the viewer's event stream.
pub async fn void_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = watch::channel(String::new());

    let guard = state.register_viewer();
    info!(viewer_id = %guard.viewer_id, viewers = state.viewers.len(), "viewer connected");

    let cancel = state.shutdown.child_token();
    let broadcast = BroadcastLoop::new(Arc::clone(&state));
    tokio::spawn(async move {
        let reason = broadcast.run(tx, cancel).await;
        info!(viewer_id = %guard.viewer_id, ?reason, "viewer stream closed");
        drop(guard);
    });

    let stream = WatchStream::from_changes(rx)
        .map(|fragment| Ok::<_, Infallible>(merge_fragments_event(&fragment)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Why a broadcast loop left the streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The viewer's stream was dropped.
    Disconnected,
    /// The server is shutting down.
    Shutdown,
}

/// Scan-evict-render-push cycle for a single viewer.
pub struct BroadcastLoop {
    state: Arc<AppState>,
    tick_interval: Duration,
    ttl: Duration,
}

impl BroadcastLoop {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            tick_interval: state.config.tick_interval,
            ttl: state.config.message_ttl,
            state,
        }
    }

    /// Current feed fragment; evicts expired messages as a side effect.
    pub fn tick(&self, now: DateTime<Utc>) -> String {
        let live = self.state.store.snapshot_and_evict(now);
        render_feed(&live, now, self.ttl)
    }

    /// Stream until the viewer goes away or `cancel` fires. The ticker is
    /// owned by this future and released with it.
    pub async fn run(self, tx: watch::Sender<String>, cancel: CancellationToken) -> CloseReason {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return CloseReason::Shutdown,
                _ = tx.closed() => return CloseReason::Disconnected,
                _ = ticker.tick() => {
                    // Failure means the receiver is gone; `closed()` ends the
                    // loop on the next pass.
                    if let Err(e) = self.push(&tx, Utc::now()) {
                        warn!("error merging fragment: {e}");
                    }
                }
            }
        }
    }

    /// One tick: render and hand the fragment to the viewer's stream.
    pub fn push(
        &self,
        tx: &watch::Sender<String>,
        now: DateTime<Utc>,
    ) -> Result<(), watch::error::SendError<String>> {
        tx.send(self.tick(now))?;
        debug!("fragment pushed");
        Ok(())
    }
}
