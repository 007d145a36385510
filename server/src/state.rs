//! Shared server state — message store, session keys and viewer tracking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::VoidError;
use crate::session::SessionKeys;
use crate::store::MessageStore;

/// A connected viewer.
#[derive(Debug)]
pub struct Viewer {
    pub connected_at: DateTime<Utc>,
}

/// Shared state accessible from all handlers.
pub struct AppState {
    pub store: MessageStore,
    pub sessions: SessionKeys,
    /// Open viewer streams keyed by a per-connection id.
    pub viewers: DashMap<Uuid, Viewer>,
    /// Cancelled on shutdown; every broadcast loop holds a child token.
    pub shutdown: CancellationToken,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, VoidError> {
        let sessions = SessionKeys::from_config(&config)?;
        Ok(Arc::new(Self {
            store: MessageStore::new(config.message_ttl),
            sessions,
            viewers: DashMap::new(),
            shutdown: CancellationToken::new(),
            config,
        }))
    }

    /// Track a viewer until the returned guard is dropped.
    pub fn register_viewer(self: &Arc<Self>) -> ViewerGuard {
        let viewer_id = Uuid::new_v4();
        self.viewers.insert(
            viewer_id,
            Viewer {
                connected_at: Utc::now(),
            },
        );
        ViewerGuard {
            viewer_id,
            state: Arc::clone(self),
        }
    }
}

/// Removes its viewer from [`AppState::viewers`] on drop.
pub struct ViewerGuard {
    pub viewer_id: Uuid,
    state: Arc<AppState>,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        if let Some((viewer_id, viewer)) = self.state.viewers.remove(&self.viewer_id) {
            let connected_secs = (Utc::now() - viewer.connected_at).num_seconds();
            debug!(viewer_id = %viewer_id, connected_secs, "viewer deregistered");
        }
    }
}
