use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clearline_types::TransferId;

/// A cleared obligation whose honoring attempt failed, awaiting
/// reconciliation. The clearing itself is valid; this only flags the
/// external side for review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub intent_id: String,
    pub transfer_id: TransferId,
    pub amount: u128,
    pub reason: String,
    pub queued_at: DateTime<Utc>,
}

/// Queue of honoring failures consumed (read-only) by the reconciliation
/// observer.
#[derive(Default)]
pub struct ReviewQueue {
    entries: Mutex<Vec<ReviewEntry>>,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: ReviewEntry) {
        self.entries.lock().expect("review lock poisoned").push(entry);
    }

    /// Non-draining copy; the observer never consumes state it reports on.
    pub fn snapshot(&self) -> Vec<ReviewEntry> {
        self.entries.lock().expect("review lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("review lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_does_not_drain() {
        let queue = ReviewQueue::new();
        queue.push(ReviewEntry {
            intent_id: "x1".into(),
            transfer_id: TransferId::from_raw(1),
            amount: 500,
            reason: "adapter unavailable".into(),
            queued_at: Utc::now(),
        });

        assert_eq!(queue.snapshot().len(), 1);
        assert_eq!(queue.snapshot().len(), 1);
        assert_eq!(queue.len(), 1);
    }
}
