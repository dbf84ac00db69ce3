use crate::error::Error;
use crate::request::{Priority, RequestDescriptor};
use crate::transport::TransportResponse;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Completion channel back to the submitting caller. Resolved exactly once.
pub type CompletionSender = oneshot::Sender<Result<TransportResponse, Error>>;

/// A pending request together with its completion channel and cancellation
/// token. Owned exclusively by the queue until admitted, then by the dispatch
/// task.
pub struct QueueEntry {
    pub descriptor: RequestDescriptor,
    pub completion: CompletionSender,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueSnapshot {
    pub queued: usize,
    pub active: usize,
}

#[derive(Default)]
struct Inner {
    pending: VecDeque<QueueEntry>,
    /// Cancellation tokens of dispatched entries, keyed by descriptor id.
    active: HashMap<Uuid, CancellationToken>,
}

/// Bounded-concurrency admission queue with two-tier priority.
///
/// High-priority entries go ahead of normal/low but behind earlier highs;
/// normal/low are appended. Ordering is FIFO within a tier. Admission
/// re-checks the active count under
/// the lock on every call, never against a cached value.
pub struct ConcurrencyQueue {
    max_concurrent: usize,
    inner: std::sync::Mutex<Inner>,
}

impl ConcurrencyQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            inner: std::sync::Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn enqueue(&self, entry: QueueEntry) {
        let mut inner = self.lock();
        match entry.descriptor.priority {
            // Ahead of every Normal/Low entry, behind earlier High entries,
            // so arrival order holds within the tier.
            Priority::High => {
                let pos = inner
                    .pending
                    .iter()
                    .position(|e| e.descriptor.priority != Priority::High)
                    .unwrap_or(inner.pending.len());
                inner.pending.insert(pos, entry);
            }
            Priority::Normal | Priority::Low => inner.pending.push_back(entry),
        }
    }

    /// Pop the next entry if a concurrency slot is free, marking it active.
    /// Safe to call reentrantly from any task; the slot check happens under
    /// the same lock as the pop.
    pub fn admit(&self) -> Option<QueueEntry> {
        let mut inner = self.lock();
        if inner.active.len() >= self.max_concurrent {
            return None;
        }
        let entry = inner.pending.pop_front()?;
        inner
            .active
            .insert(entry.descriptor.id, entry.cancel.clone());
        Some(entry)
    }

    /// Free the slot held by a dispatched entry.
    pub fn release(&self, id: Uuid) {
        self.lock().active.remove(&id);
    }

    /// Cancel by id. A still-queued entry is removed and its continuation
    /// rejected with [`Error::Cancelled`]; a dispatched entry has its
    /// in-flight attempt aborted via its token. Returns false for unknown ids.
    pub fn cancel(&self, id: Uuid) -> bool {
        let mut inner = self.lock();
        if let Some(pos) = inner.pending.iter().position(|e| e.descriptor.id == id) {
            if let Some(entry) = inner.pending.remove(pos) {
                debug!(request_id = %id, "cancelled queued request");
                entry.cancel.cancel();
                let _ = entry.completion.send(Err(Error::Cancelled));
                return true;
            }
        }
        if let Some(token) = inner.active.get(&id) {
            debug!(request_id = %id, "cancelling in-flight request");
            token.cancel();
            return true;
        }
        false
    }

    /// Reject every pending entry with [`Error::QueueCleared`]. Dispatched
    /// entries are unaffected. Used for teardown/recovery.
    pub fn clear(&self) {
        let drained: Vec<QueueEntry> = {
            let mut inner = self.lock();
            inner.pending.drain(..).collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "queue cleared");
        }
        for entry in drained {
            let _ = entry.completion.send(Err(Error::QueueCleared));
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let inner = self.lock();
        QueueSnapshot {
            queued: inner.pending.len(),
            active: inner.active.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::Receiver;

    fn entry(priority: Priority) -> (QueueEntry, Receiver<Result<TransportResponse, Error>>) {
        let mut descriptor = RequestDescriptor::new("https://api.example.com/v1/chat", "POST");
        descriptor.priority = priority;
        let (tx, rx) = oneshot::channel();
        (
            QueueEntry {
                descriptor,
                completion: tx,
                cancel: CancellationToken::new(),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn test_fifo_within_tier() {
        let q = ConcurrencyQueue::new(10);
        let (a, _rx_a) = entry(Priority::Normal);
        let (b, _rx_b) = entry(Priority::Normal);
        let a_id = a.descriptor.id;
        let b_id = b.descriptor.id;
        q.enqueue(a);
        q.enqueue(b);

        assert_eq!(q.admit().unwrap().descriptor.id, a_id);
        assert_eq!(q.admit().unwrap().descriptor.id, b_id);
    }

    #[tokio::test]
    async fn test_high_priority_jumps_queue() {
        let q = ConcurrencyQueue::new(10);
        let (n1, _r1) = entry(Priority::Normal);
        let (n2, _r2) = entry(Priority::Normal);
        let (hi, _r3) = entry(Priority::High);
        let hi_id = hi.descriptor.id;
        q.enqueue(n1);
        q.enqueue(n2);
        q.enqueue(hi);

        assert_eq!(q.admit().unwrap().descriptor.id, hi_id);
    }

    #[tokio::test]
    async fn test_fifo_among_high_priority_entries() {
        let q = ConcurrencyQueue::new(10);
        let (n, _rn) = entry(Priority::Normal);
        let (h1, _r1) = entry(Priority::High);
        let (h2, _r2) = entry(Priority::High);
        let n_id = n.descriptor.id;
        let h1_id = h1.descriptor.id;
        let h2_id = h2.descriptor.id;
        q.enqueue(n);
        q.enqueue(h1);
        q.enqueue(h2);

        // Both jump the normal entry but keep arrival order between them.
        assert_eq!(q.admit().unwrap().descriptor.id, h1_id);
        assert_eq!(q.admit().unwrap().descriptor.id, h2_id);
        assert_eq!(q.admit().unwrap().descriptor.id, n_id);
    }

    #[tokio::test]
    async fn test_admission_respects_concurrency_cap() {
        let q = ConcurrencyQueue::new(2);
        for _ in 0..4 {
            let (e, rx) = entry(Priority::Normal);
            std::mem::forget(rx);
            q.enqueue(e);
        }

        let a = q.admit().unwrap();
        let _b = q.admit().unwrap();
        assert!(q.admit().is_none(), "third admission must be denied");
        assert_eq!(q.snapshot().active, 2);
        assert_eq!(q.snapshot().queued, 2);

        q.release(a.descriptor.id);
        assert!(q.admit().is_some(), "freed slot admits the next entry");
    }

    #[tokio::test]
    async fn test_cancel_pending_rejects_once() {
        let q = ConcurrencyQueue::new(1);
        let (e, rx) = entry(Priority::Normal);
        let id = e.descriptor.id;
        q.enqueue(e);

        assert!(q.cancel(id));
        assert!(matches!(rx.await, Ok(Err(Error::Cancelled))));
        assert_eq!(q.snapshot().queued, 0);
        // Second cancel of the same id is a no-op.
        assert!(!q.cancel(id));
    }

    #[tokio::test]
    async fn test_cancel_active_triggers_token() {
        let q = ConcurrencyQueue::new(1);
        let (e, _rx) = entry(Priority::Normal);
        let id = e.descriptor.id;
        q.enqueue(e);
        let admitted = q.admit().unwrap();
        assert!(!admitted.cancel.is_cancelled());

        assert!(q.cancel(id));
        assert!(admitted.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_clear_rejects_all_pending() {
        let q = ConcurrencyQueue::new(1);
        let mut receivers = vec![];
        for _ in 0..3 {
            let (e, rx) = entry(Priority::Normal);
            q.enqueue(e);
            receivers.push(rx);
        }

        q.clear();
        assert_eq!(q.snapshot().queued, 0);
        for rx in receivers {
            assert!(matches!(rx.await, Ok(Err(Error::QueueCleared))));
        }
    }
}
