use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::QueueError;

/// Default largest batch handed out by one receive.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Default long-poll wait of one receive.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

/// Default bound of the in-memory queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// One queued message. The body is the hex text of a raw frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: u64,
    pub body: String,
    /// Opaque handle used to delete this delivery.
    pub receipt: String,
}

/// Result of a batch delete. Unknown receipts are reported, not fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: usize,
    pub failed: Vec<String>,
}

/// Receive parameters for one long poll.
#[derive(Debug, Clone)]
pub struct ReceiveConfig {
    /// Largest batch to take. Default: 10.
    pub max_messages: usize,
    /// How long to wait for the first message. Default: 5 s.
    pub wait: Duration,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            wait: DEFAULT_WAIT,
        }
    }
}

/// A message queue with batch receive and batch delete.
pub trait MessageQueue: Send + Sync {
    /// Take up to `max` messages, waiting up to `wait` for at least one.
    /// An empty batch means the wait elapsed.
    fn receive_batch(
        &self,
        max: usize,
        wait: Duration,
    ) -> impl Future<Output = Result<Vec<QueueMessage>, QueueError>> + Send;

    /// Acknowledge deliveries by receipt.
    fn delete_batch(
        &self,
        receipts: &[String],
    ) -> impl Future<Output = Result<DeleteOutcome, QueueError>> + Send;
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<(u64, String)>,
    in_flight: HashMap<String, u64>,
    next_id: u64,
    deliveries: u64,
}

/// Bounded in-process queue.
///
/// Received messages stay in flight until deleted and are never handed out
/// again.
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    ready: Notify,
    capacity: usize,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            ready: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    /// Enqueue a message body and return its id.
    pub fn push(&self, body: impl Into<String>) -> Result<u64, QueueError> {
        let id = {
            let mut state = self.lock()?;
            if state.pending.len() >= self.capacity {
                return Err(QueueError::Full {
                    capacity: self.capacity,
                });
            }
            let id = state.next_id;
            state.next_id += 1;
            state.pending.push_back((id, body.into()));
            id
        };
        trace!(id, "message enqueued");
        self.ready.notify_waiters();
        Ok(id)
    }

    /// Messages waiting to be received.
    pub fn pending(&self) -> usize {
        self.lock().map(|s| s.pending.len()).unwrap_or(0)
    }

    /// Messages received but not yet deleted.
    pub fn in_flight(&self) -> usize {
        self.lock().map(|s| s.in_flight.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, QueueState>, QueueError> {
        self.state
            .lock()
            .map_err(|_| QueueError::Backend("queue state poisoned".into()))
    }

    fn take(&self, max: usize) -> Result<Vec<QueueMessage>, QueueError> {
        let mut state = self.lock()?;
        let count = max.min(state.pending.len());
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            let Some((id, body)) = state.pending.pop_front() else {
                break;
            };
            state.deliveries += 1;
            let receipt = format!("{id}-{}", state.deliveries);
            state.in_flight.insert(receipt.clone(), id);
            batch.push(QueueMessage { id, body, receipt });
        }
        Ok(batch)
    }
}

impl MessageQueue for InMemoryQueue {
    async fn receive_batch(
        &self,
        max: usize,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let deadline = Instant::now() + wait;
        let max = max.max(1);
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let batch = self.take(max)?;
            if !batch.is_empty() {
                debug!(count = batch.len(), "batch received");
                return Ok(batch);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn delete_batch(&self, receipts: &[String]) -> Result<DeleteOutcome, QueueError> {
        let mut state = self.lock()?;
        let mut outcome = DeleteOutcome::default();
        for receipt in receipts {
            if state.in_flight.remove(receipt).is_some() {
                outcome.deleted += 1;
            } else {
                outcome.failed.push(receipt.clone());
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn batch_is_bounded_and_ordered() {
        let queue = InMemoryQueue::new();
        for i in 0..12 {
            queue.push(format!("body-{i}")).unwrap();
        }

        let first = queue.receive_batch(10, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].body, "body-0");
        assert_eq!(first[9].body, "body-9");

        let second = queue.receive_batch(10, Duration::ZERO).await.unwrap();
        let bodies: Vec<&str> = second.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["body-10", "body-11"]);
        assert_eq!(queue.in_flight(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_receive_waits_then_returns_nothing() {
        let queue = InMemoryQueue::new();
        let started = Instant::now();
        let batch = queue.receive_batch(10, Duration::from_secs(5)).await.unwrap();
        assert!(batch.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn push_wakes_waiting_receiver() {
        let queue = Arc::new(InMemoryQueue::new());
        let receiver = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.receive_batch(10, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        queue.push("abcd").unwrap();

        let batch = receiver.await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, "abcd");
    }

    #[tokio::test]
    async fn delete_clears_in_flight_and_reports_unknown() {
        let queue = InMemoryQueue::new();
        queue.push("a").unwrap();
        queue.push("b").unwrap();
        let batch = queue.receive_batch(10, Duration::ZERO).await.unwrap();

        let mut receipts: Vec<String> = batch.iter().map(|m| m.receipt.clone()).collect();
        receipts.push("bogus".into());
        let outcome = queue.delete_batch(&receipts).await.unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.failed, vec!["bogus".to_string()]);
        assert_eq!(queue.in_flight(), 0);

        let again = queue.delete_batch(&receipts[..1]).await.unwrap();
        assert_eq!(again.deleted, 0);
    }

    #[test]
    fn push_rejects_when_full() {
        let queue = InMemoryQueue::with_capacity(2);
        queue.push("a").unwrap();
        queue.push("b").unwrap();
        assert!(matches!(
            queue.push("c"),
            Err(QueueError::Full { capacity: 2 })
        ));
        assert_eq!(queue.pending(), 2);
    }
}
