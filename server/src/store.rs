//! In-memory message store.
//!
//! One instance per process, shared by the ingest handler (insert) and every
//! viewer's broadcast loop (scan + evict). The map itself never leaves this
//! module; shard locks are held only for the in-memory work.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::types::{Message, NewMessage};

pub struct MessageStore {
    messages: DashMap<Uuid, Message>,
    ttl: chrono::Duration,
}

impl MessageStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            messages: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Store a message under a fresh id and return the id.
    pub fn insert(&self, message: NewMessage) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if let Entry::Vacant(slot) = self.messages.entry(id) {
                slot.insert(message.into_message(id));
                return id;
            }
        }
    }

    /// Remove every message older than the TTL at `now` and return the rest.
    ///
    /// A message exactly TTL old is still live. Order is unspecified.
    ///
    /// The scan locks one shard at a time, so it is not a single snapshot of
    /// the whole store: a message inserted mid-scan may be missed until the
    /// next tick, and two inserts may be seen one without the other.
    pub fn snapshot_and_evict(&self, now: DateTime<Utc>) -> Vec<Message> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut live = Vec::with_capacity(self.messages.len());
        let mut evicted = 0usize;
        self.messages.retain(|_, message| {
            if message.age(now) > self.ttl {
                evicted += 1;
                false
            } else {
                live.push(message.clone());
                true
            }
        });
        if evicted > 0 {
            debug!(evicted, live = live.len(), "evicted expired messages");
        }
        live
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::types::{Colour, Position};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn draft(text: &str, created_at: DateTime<Utc>) -> NewMessage {
        NewMessage {
            text: text.into(),
            created_at,
            colour: Colour::from_identity(0x123ABC),
            position: Position { x: 50.0, y: 50.0 },
        }
    }

    fn store() -> MessageStore {
        MessageStore::new(Duration::from_secs(10))
    }

    #[rstest]
    #[case(0, true)]
    #[case(5_000, true)]
    #[case(10_000, true)]
    #[case(10_001, false)]
    #[case(11_000, false)]
    fn live_iff_within_ttl(#[case] age_ms: i64, #[case] live: bool) {
        let store = store();
        let id = store.insert(draft("hello", t0()));

        let snapshot = store.snapshot_and_evict(t0() + chrono::Duration::milliseconds(age_ms));

        assert_eq!(snapshot.iter().any(|m| m.id == id), live);
        assert_eq!(store.len(), usize::from(live));
    }

    #[test]
    fn eviction_is_permanent() {
        let store = store();
        store.insert(draft("gone", t0()));
        let kept = store.insert(draft("kept", t0() + chrono::Duration::seconds(8)));

        let later = t0() + chrono::Duration::seconds(11);
        let first = store.snapshot_and_evict(later);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, kept);

        // Same instant, then an earlier one: the evicted record never returns.
        assert_eq!(store.snapshot_and_evict(later).len(), 1);
        assert_eq!(store.snapshot_and_evict(t0()).len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_returns_copies_of_stored_records() {
        let store = store();
        let id = store.insert(draft("hello", t0()));

        let snapshot = store.snapshot_and_evict(t0());
        assert_eq!(snapshot.len(), 1);
        let message = &snapshot[0];
        assert_eq!(message.id, id);
        assert_eq!(message.text, "hello");
        assert_eq!(message.created_at, t0());
        assert_eq!(message.colour.as_str(), "#123abc");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_get_distinct_ids() {
        let store = Arc::new(store());
        let now = Utc::now();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert(draft(&format!("m{i}"), now)) })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 64);
        assert_eq!(store.len(), 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn scans_race_with_inserts_without_losing_live_records() {
        let store = Arc::new(store());
        let now = Utc::now();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..200 {
                    store.insert(draft(&format!("m{i}"), now));
                    tokio::task::yield_now().await;
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        store.snapshot_and_evict(now);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(store.snapshot_and_evict(now).len(), 200);
    }
}
