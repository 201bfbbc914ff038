use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use clearline_types::TransferAudit;

use crate::mirror::NarrativeMirror;

/// Bounded fire-and-forget queue feeding the narrative mirror.
///
/// Producers never block: when the queue is full the oldest unobserved entry
/// is dropped and logged. Overflow loses observability, never ledger
/// correctness, since the ledger stays authoritative and the mirror is a copy.
pub struct DispatchQueue {
    capacity: usize,
    inner: Mutex<VecDeque<TransferAudit>>,
    notify: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl DispatchQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue an audit record. Drops the oldest entry when full.
    pub fn push(&self, audit: TransferAudit) {
        if self.closed.load(Ordering::Acquire) {
            warn!(transfer = %audit.transfer_id, "dispatch queue closed; audit record discarded");
            return;
        }

        let mut queue = self.inner.lock().expect("dispatch queue lock poisoned");
        if queue.len() == self.capacity {
            if let Some(oldest) = queue.pop_front() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    transfer = %oldest.transfer_id,
                    capacity = self.capacity,
                    "dispatch queue full; dropped oldest audit record"
                );
            }
        }
        queue.push_back(audit);
        drop(queue);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<TransferAudit> {
        self.inner
            .lock()
            .expect("dispatch queue lock poisoned")
            .pop_front()
    }

    /// Stop accepting new entries and wake the worker so it can finish the
    /// backlog and exit.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("dispatch queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries lost to the overflow policy so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Worker loop: deliver entries to the mirror until the queue is closed
    /// and drained. Mirror failures are logged, not retried inline.
    pub async fn drain(&self, mirror: Arc<dyn NarrativeMirror>) {
        loop {
            match self.pop() {
                Some(audit) => {
                    if let Err(e) = mirror.record(&audit).await {
                        warn!(transfer = %audit.transfer_id, error = %e, "mirror write failed");
                    } else {
                        debug!(transfer = %audit.transfer_id, "mirror write delivered");
                    }
                }
                None => {
                    if self.closed.load(Ordering::Acquire) {
                        break;
                    }
                    self.notify.notified().await;
                }
            }
        }
    }

    /// Spawn the background worker driving [`Self::drain`].
    pub fn spawn_worker(
        queue: Arc<Self>,
        mirror: Arc<dyn NarrativeMirror>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { queue.drain(mirror).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearline_types::{ClearingStatus, TransferId};

    use crate::mirror::InMemoryMirror;

    fn audit(n: u128) -> TransferAudit {
        TransferAudit::new(
            TransferId::from_raw(n),
            format!("intent-{n}"),
            n,
            "test",
            ClearingStatus::ClearedAndHonored,
            None,
        )
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_counts() {
        let queue = Arc::new(DispatchQueue::new(2));
        queue.push(audit(1));
        queue.push(audit(2));
        queue.push(audit(3));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);

        let mirror = Arc::new(InMemoryMirror::new());
        queue.close();
        queue.drain(mirror.clone() as Arc<dyn NarrativeMirror>).await;

        // The oldest record (1) was the casualty.
        assert!(mirror.get(TransferId::from_raw(1)).is_none());
        assert!(mirror.get(TransferId::from_raw(2)).is_some());
        assert!(mirror.get(TransferId::from_raw(3)).is_some());
    }

    #[tokio::test]
    async fn background_worker_delivers_entries() {
        let queue = Arc::new(DispatchQueue::new(16));
        let mirror = Arc::new(InMemoryMirror::new());
        let handle =
            DispatchQueue::spawn_worker(queue.clone(), mirror.clone() as Arc<dyn NarrativeMirror>);

        queue.push(audit(7));
        queue.push(audit(8));
        queue.close();
        handle.await.unwrap();

        assert_eq!(mirror.len(), 2);
        assert_eq!(queue.dropped(), 0);
    }

    #[tokio::test]
    async fn push_after_close_is_discarded() {
        let queue = Arc::new(DispatchQueue::new(4));
        queue.close();
        queue.push(audit(1));
        assert!(queue.is_empty());
    }
}
