//! Live update fan-out to connected viewers.
//!
//! One broadcast channel per (project, revision) pair. Publishing sends the
//! revision's full point snapshot to current subscribers of that pair only;
//! viewers of other projects or revisions see nothing. Delivery is
//! fire-and-forget: closed or lagging receivers are dropped silently and no
//! error reaches the publisher.
//!
//! Every update carries the mutation seq its snapshot was taken at (assigned
//! under the registry write lock). Publishers can reach the hub out of
//! mutation order, so the hub refuses any update whose seq is not newer than
//! the last one it sent for that pair; subscribers never regress to a stale
//! snapshot.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::Point;

/// Full-snapshot update for one (project, revision) pair.
#[derive(Debug, Clone, Serialize)]
pub struct PointsUpdate {
    pub project_id: Uuid,
    pub revision: usize,
    pub points: Vec<Point>,
    /// Mutation seq of the snapshot; higher supersedes lower.
    #[serde(skip)]
    pub seq: u64,
}

/// Broadcast channel plus the seq of the last update sent on it.
struct PairChannel {
    sender: broadcast::Sender<PointsUpdate>,
    last_seq: u64,
}

/// Tracks broadcast channels per (project, revision) pair.
pub struct SyncHub {
    channels: RwLock<HashMap<(Uuid, usize), PairChannel>>,
}

impl SyncHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes to updates for one (project, revision) pair.
    pub async fn subscribe(
        &self,
        project_id: Uuid,
        revision: usize,
    ) -> broadcast::Receiver<PointsUpdate> {
        let key = (project_id, revision);

        let mut channels = self.channels.write().await;

        if let Some(channel) = channels.get(&key) {
            channel.sender.subscribe()
        } else {
            // Bounded channel; slow observers lag and drop rather than
            // blocking the publisher.
            let (sender, receiver) = broadcast::channel(16);
            channels.insert(key, PairChannel {
                sender,
                last_seq: 0,
            });
            receiver
        }
    }

    /// Publishes an update to all subscribers of its (project, revision)
    /// pair, unless a newer snapshot of that pair has already been sent.
    pub async fn publish(&self, update: PointsUpdate) {
        let key = (update.project_id, update.revision);

        let mut channels = self.channels.write().await;

        if let Some(channel) = channels.get_mut(&key) {
            if update.seq <= channel.last_seq {
                tracing::debug!(
                    "Dropping stale snapshot (seq {} <= {}) for {}/{}",
                    update.seq,
                    channel.last_seq,
                    update.project_id,
                    update.revision
                );
                return;
            }
            channel.last_seq = update.seq;
            // Ignore send errors (no subscribers)
            let _ = channel.sender.send(update);
        }
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comment;

    fn update_for(project_id: Uuid, revision: usize) -> PointsUpdate {
        update_at_seq(project_id, revision, 1)
    }

    fn update_at_seq(project_id: Uuid, revision: usize, seq: u64) -> PointsUpdate {
        PointsUpdate {
            project_id,
            revision,
            points: vec![Point::new(10.0, 10.0, Comment::new("alice", "note"))],
            seq,
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let hub = SyncHub::new();
        let project_id = Uuid::new_v4();

        let mut rx = hub.subscribe(project_id, 0).await;
        hub.publish(update_for(project_id, 0)).await;

        let update = rx.try_recv().unwrap();
        assert_eq!(update.project_id, project_id);
        assert_eq!(update.revision, 0);
        assert_eq!(update.points.len(), 1);
    }

    #[tokio::test]
    async fn test_pairs_are_isolated() {
        let hub = SyncHub::new();
        let project_a = Uuid::new_v4();
        let project_b = Uuid::new_v4();

        let mut rx_a0 = hub.subscribe(project_a, 0).await;
        let mut rx_a1 = hub.subscribe(project_a, 1).await;
        let mut rx_b0 = hub.subscribe(project_b, 0).await;

        hub.publish(update_for(project_a, 0)).await;

        assert!(rx_a0.try_recv().is_ok());
        // other revision of the same project stays quiet
        assert!(rx_a1.try_recv().is_err());
        // other project stays quiet
        assert!(rx_b0.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_snapshot_never_overwrites_newer() {
        let hub = SyncHub::new();
        let project_id = Uuid::new_v4();
        let mut rx = hub.subscribe(project_id, 0).await;

        // Two mutations race to the hub and arrive inverted: the seq-2
        // snapshot lands first, then the seq-1 one. Only the newer snapshot
        // may go out.
        hub.publish(update_at_seq(project_id, 0, 2)).await;
        hub.publish(update_at_seq(project_id, 0, 1)).await;

        assert_eq!(rx.try_recv().unwrap().seq, 2);
        assert!(rx.try_recv().is_err());

        // the next real mutation gets through
        hub.publish(update_at_seq(project_id, 0, 3)).await;
        assert_eq!(rx.try_recv().unwrap().seq, 3);
    }

    #[tokio::test]
    async fn test_seq_tracking_is_per_pair() {
        let hub = SyncHub::new();
        let project_id = Uuid::new_v4();
        let mut rx0 = hub.subscribe(project_id, 0).await;
        let mut rx1 = hub.subscribe(project_id, 1).await;

        hub.publish(update_at_seq(project_id, 0, 5)).await;
        // revision 1 is at seq 1; revision 0's seq must not mask it
        hub.publish(update_at_seq(project_id, 1, 1)).await;

        assert!(rx0.try_recv().is_ok());
        assert!(rx1.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let hub = SyncHub::new();
        // No channel exists for this pair; publish must not panic or error.
        hub.publish(update_for(Uuid::new_v4(), 0)).await;
    }

    #[tokio::test]
    async fn test_multiple_subscribers_all_receive() {
        let hub = SyncHub::new();
        let project_id = Uuid::new_v4();

        let mut rx1 = hub.subscribe(project_id, 0).await;
        let mut rx2 = hub.subscribe(project_id, 0).await;

        hub.publish(update_for(project_id, 0)).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }
}
