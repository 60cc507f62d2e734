use std::sync::Arc;

use tavola_types::events::ChangeEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Fan-out of local data changes. Repositories publish after every
/// successful write; anything that displays data subscribes and re-reads.
#[derive(Clone)]
pub struct ChangeFeed {
    inner: Arc<ChangeFeedInner>,
}

struct ChangeFeedInner {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(ChangeFeedInner { tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.tx.subscribe()
    }

    /// Having no subscribers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        trace!(?event, "change published");
        let _ = self.inner.tx.send(event);
    }
}
