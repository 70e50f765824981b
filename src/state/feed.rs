use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, broadcast};

use super::SseHub;
use crate::dto::sse::ServerEvent;

/// Hub of one match plus the lock that puts its publications in order.
#[derive(Clone)]
struct MatchFeed {
    hub: SseHub,
    order: Arc<Mutex<()>>,
}

/// Per-match broadcast hubs, created lazily on first subscription.
pub struct MatchFeeds {
    hubs: DashMap<String, MatchFeed>,
    capacity: usize,
}

/// Handle used to push snapshots to the subscribers of one match.
///
/// Holders take [`FeedPublisher::turn`] before reading the snapshot they publish, so
/// snapshots leave in the order they were read.
pub struct FeedPublisher {
    feed: MatchFeed,
}

impl FeedPublisher {
    /// Wait until no other publisher of this match is between its read and its send.
    pub async fn turn(&self) -> OwnedMutexGuard<()> {
        self.feed.order.clone().lock_owned().await
    }

    /// Push an event to the subscribers of the match.
    pub fn publish(&self, event: ServerEvent) {
        self.feed.hub.broadcast(event);
    }
}

impl MatchFeeds {
    /// Create an empty registry whose hubs buffer `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to future events of `match_id`.
    pub fn subscribe(&self, match_id: &str) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(match_id.to_owned())
            .or_insert_with(|| MatchFeed {
                hub: SseHub::new(self.capacity),
                order: Arc::new(Mutex::new(())),
            })
            .hub
            .subscribe()
    }

    /// Publisher for `match_id`, `None` while nobody listens.
    pub fn publisher(&self, match_id: &str) -> Option<FeedPublisher> {
        self.hubs.get(match_id).map(|feed| FeedPublisher {
            feed: feed.clone(),
        })
    }

    /// Drop the hub of `match_id` once its last receiver is gone.
    pub fn release(&self, match_id: &str) {
        self.hubs
            .remove_if(match_id, |_, feed| feed.hub.receiver_count() == 0);
    }

    /// Number of matches that currently have a hub.
    pub fn active_feeds(&self) -> usize {
        self.hubs.len()
    }
}
