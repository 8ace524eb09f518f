use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Callback invoked with the raw `data` payload of a stream frame
pub type StreamCallback = Arc<dyn Fn(Value) + Send + Sync + 'static>;

/// What a full subscriber mailbox does with a new payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Evict the oldest queued payload to make room
    #[default]
    DropOldest,
    /// Discard the incoming payload
    DropNewest,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounded FIFO between the read loop and one callback worker
pub(crate) struct Mailbox {
    queue: Mutex<VecDeque<Value>>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
    closed: AtomicBool,
    overflowing: AtomicBool,
    dropped: AtomicU64,
}

impl Mailbox {
    pub(crate) fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            notify: Notify::new(),
            capacity,
            policy,
            closed: AtomicBool::new(false),
            overflowing: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a payload without blocking; returns false if something was dropped
    pub(crate) fn push(&self, value: Value) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        let overflowed = {
            let mut queue = lock(&self.queue);
            if queue.len() < self.capacity {
                queue.push_back(value);
                false
            } else {
                if self.policy == OverflowPolicy::DropOldest {
                    queue.pop_front();
                    queue.push_back(value);
                }
                true
            }
        };

        if overflowed {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if !self.overflowing.swap(true, Ordering::Relaxed) {
                warn!(
                    capacity = self.capacity,
                    policy = ?self.policy,
                    dropped_total = total,
                    "Stream callback is falling behind, dropping payloads"
                );
            }
        } else {
            self.overflowing.store(false, Ordering::Relaxed);
        }

        self.notify.notify_one();
        !overflowed
    }

    pub(crate) fn pop(&self) -> Option<Value> {
        lock(&self.queue).pop_front()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.queue).len()
    }

    async fn next(&self) -> Option<Value> {
        loop {
            if let Some(value) = self.pop() {
                return Some(value);
            }
            if self.is_closed() {
                return None;
            }
            self.notify.notified().await;
        }
    }
}

/// One registered callback and the worker draining its mailbox
///
/// The worker stops once the subscriber is dropped from every stream.
pub(crate) struct Subscriber {
    mailbox: Arc<Mailbox>,
}

impl Subscriber {
    /// Must be called from within a Tokio runtime
    pub(crate) fn spawn(callback: StreamCallback, capacity: usize, policy: OverflowPolicy) -> Arc<Self> {
        let mailbox = Arc::new(Mailbox::new(capacity, policy));
        let worker_mailbox = mailbox.clone();

        tokio::spawn(async move {
            while let Some(payload) = worker_mailbox.next().await {
                if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                    warn!("Stream callback panicked; continuing with next payload");
                }
            }
            trace!(dropped = worker_mailbox.dropped(), "Stream callback worker stopped");
        });

        Arc::new(Self { mailbox })
    }

    pub(crate) fn deliver(&self, payload: Value) -> bool {
        self.mailbox.push(payload)
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.mailbox.close();
    }
}

/// Stream name → subscribers, plus the private flag of every stream
///
/// Every name in `callbacks` also has an entry in `private`.
#[derive(Default)]
pub(crate) struct Registry {
    callbacks: HashMap<String, Vec<Arc<Subscriber>>>,
    private: HashMap<String, bool>,
}

impl Registry {
    pub(crate) fn register(&mut self, streams: &[String], subscriber: &Arc<Subscriber>, private: bool) {
        for stream in streams {
            self.callbacks
                .entry(stream.clone())
                .or_default()
                .push(subscriber.clone());

            let flag = self.private.entry(stream.clone()).or_insert(false);
            *flag |= private;
        }
    }

    pub(crate) fn remove(&mut self, streams: &[String]) {
        for stream in streams {
            self.callbacks.remove(stream);
            self.private.remove(stream);
        }
    }

    pub(crate) fn subscribers(&self, stream: &str) -> Vec<Arc<Subscriber>> {
        self.callbacks.get(stream).cloned().unwrap_or_default()
    }

    pub(crate) fn is_private(&self, stream: &str) -> Option<bool> {
        self.private.get(stream).copied()
    }

    /// Registered stream names split into (public, private), each sorted
    pub(crate) fn partition(&self) -> (Vec<String>, Vec<String>) {
        let (mut private, mut public): (Vec<String>, Vec<String>) = self
            .callbacks
            .keys()
            .cloned()
            .partition(|stream| self.private.get(stream).copied().unwrap_or(false));
        public.sort();
        private.sort();
        (public, private)
    }

    pub(crate) fn streams(&self) -> Vec<String> {
        let mut streams: Vec<String> = self.callbacks.keys().cloned().collect();
        streams.sort();
        streams
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn test_drop_oldest_keeps_latest_payloads() {
        let mailbox = Mailbox::new(2, OverflowPolicy::DropOldest);
        assert!(mailbox.push(json!(1)));
        assert!(mailbox.push(json!(2)));
        assert!(!mailbox.push(json!(3)));

        assert_eq!(mailbox.dropped(), 1);
        assert_eq!(mailbox.pop(), Some(json!(2)));
        assert_eq!(mailbox.pop(), Some(json!(3)));
        assert_eq!(mailbox.pop(), None);
    }

    #[test]
    fn test_drop_newest_keeps_queued_payloads() {
        let mailbox = Mailbox::new(2, OverflowPolicy::DropNewest);
        mailbox.push(json!(1));
        mailbox.push(json!(2));
        assert!(!mailbox.push(json!(3)));

        assert_eq!(mailbox.len(), 2);
        assert_eq!(mailbox.pop(), Some(json!(1)));
        assert_eq!(mailbox.pop(), Some(json!(2)));
    }

    #[test]
    fn test_closed_mailbox_rejects_payloads() {
        let mailbox = Mailbox::new(4, OverflowPolicy::DropOldest);
        mailbox.close();
        assert!(!mailbox.push(json!(1)));
        assert_eq!(mailbox.len(), 0);
    }

    #[test]
    fn test_registry_private_flags() {
        let mut registry = Registry::default();
        let sub = Arc::new(Subscriber {
            mailbox: Arc::new(Mailbox::new(1, OverflowPolicy::DropOldest)),
        });

        registry.register(&["account.orderUpdate".to_string()], &sub, true);
        registry.register(
            &["trade.SOL_USDC".to_string(), "account.orderUpdate".to_string()],
            &sub,
            false,
        );

        assert_eq!(registry.is_private("account.orderUpdate"), Some(true));
        assert_eq!(registry.is_private("trade.SOL_USDC"), Some(false));
        assert_eq!(registry.subscribers("account.orderUpdate").len(), 2);

        let (public, private) = registry.partition();
        assert_eq!(public, vec!["trade.SOL_USDC".to_string()]);
        assert_eq!(private, vec!["account.orderUpdate".to_string()]);

        registry.remove(&["account.orderUpdate".to_string(), "never.subscribed".to_string()]);
        assert_eq!(registry.is_private("account.orderUpdate"), None);
        assert!(registry.subscribers("account.orderUpdate").is_empty());
        assert_eq!(registry.streams(), vec!["trade.SOL_USDC".to_string()]);
    }

    #[tokio::test]
    async fn test_worker_preserves_order_and_stops_on_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback: StreamCallback = Arc::new(move |value| {
            let _ = tx.send(value);
        });

        let subscriber = Subscriber::spawn(callback, 16, OverflowPolicy::DropOldest);
        for i in 0..5 {
            subscriber.deliver(json!(i));
        }

        for i in 0..5 {
            let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, json!(i));
        }

        drop(subscriber);
        // Worker exits and drops the callback, closing the channel
        let closed = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(closed.is_none());
    }
}
