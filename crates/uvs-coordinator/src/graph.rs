//! Outbound notification channel to auxiliary collaborators (the
//! knowledge-graph extractor named in spec §1/§4.6 step 6).
//!
//! Not on the critical path: a collaborator that stalls or backs up must
//! never slow a `store` ack, so the hand-off is a bounded drop-oldest
//! queue, not a direct call.

use crate::mirror::DropOldestQueue;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use uvs_domain::value_objects::Memory;

/// One event handed to an auxiliary collaborator.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// A memory was stored.
    Stored(Memory),
    /// A memory was deleted.
    Deleted(Uuid),
}

/// Consumer of graph events. The coordinator never awaits this directly;
/// a drainer task pulls from the queue and calls it, so collaborator
/// backpressure cannot block a write ack.
#[async_trait]
pub trait GraphCollaborator: Send + Sync {
    /// Handle one event. Failures are logged by the drainer and otherwise
    /// swallowed — never at-least-once, per spec §1 Non-goals.
    async fn handle(&self, event: GraphEvent);
}

/// Non-blocking hand-off queue the coordinator pushes into.
pub struct GraphNotifier {
    queue: Arc<DropOldestQueue<GraphEvent>>,
}

impl GraphNotifier {
    /// Build a notifier with the given bounded queue capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(DropOldestQueue::new(capacity)),
        }
    }

    /// Non-blocking push; never awaited by the write path.
    pub fn notify(&self, event: GraphEvent) {
        self.queue.push(event);
    }

    /// Handle to the underlying queue, for a drainer task to poll.
    pub fn queue(&self) -> Arc<DropOldestQueue<GraphEvent>> {
        self.queue.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uvs_domain::value_objects::Embedding;

    struct CountingCollaborator(AtomicUsize);

    #[async_trait]
    impl GraphCollaborator for CountingCollaborator {
        async fn handle(&self, _event: GraphEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_memory() -> Memory {
        let now = Utc::now();
        Memory {
            id: Uuid::new_v4(),
            content: "x".to_string(),
            embedding: Embedding {
                vector: vec![0.1, 0.2],
                model: "test".to_string(),
            },
            metadata: HashMap::new(),
            importance_score: 0.5,
            created_at: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    #[tokio::test]
    async fn drainer_observes_notified_events() {
        let notifier = GraphNotifier::new(4);
        notifier.notify(GraphEvent::Stored(sample_memory()));
        let collaborator = CountingCollaborator(AtomicUsize::new(0));
        let pending = notifier.queue().drain();
        for event in pending {
            collaborator.handle(event).await;
        }
        assert_eq!(collaborator.0.load(Ordering::SeqCst), 1);
    }
}
