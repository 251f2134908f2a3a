//! Result delivery queue.
//!
//! Every admin call ends with exactly one [`AdminEvent`] posted here, in
//! completion order. Any number of tasks may poll the same queue; a
//! [`yield_waiter`](ResultQueue::yield_waiter) call wakes exactly one of
//! them without delivering an event.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::admin::AdminEvent;

enum QueueMessage {
    Event(Box<AdminEvent>),
    Wakeup,
}

struct QueueInner {
    tx: mpsc::UnboundedSender<QueueMessage>,
    rx: Mutex<mpsc::UnboundedReceiver<QueueMessage>>,
    pending: AtomicUsize,
}

/// Cloneable handle to a queue of admin events.
#[derive(Clone)]
pub struct ResultQueue {
    inner: Arc<QueueInner>,
}

impl Default for ResultQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResultQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl ResultQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(QueueInner {
                tx,
                rx: Mutex::new(rx),
                pending: AtomicUsize::new(0),
            }),
        }
    }

    /// Post an event. The queue owns both channel ends, so this never fails.
    pub(crate) fn push(&self, event: AdminEvent) {
        trace!(op = %event.op(), "Posting admin event");
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        if self.inner.tx.send(QueueMessage::Event(Box::new(event))).is_err() {
            self.inner.pending.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Wait for the next event.
    ///
    /// `None` timeout waits indefinitely. Returns `None` when the timeout
    /// expires or when woken by [`yield_waiter`](Self::yield_waiter).
    ///
    /// The timeout also covers waiting behind other pollers.
    pub async fn poll(&self, timeout: Option<Duration>) -> Option<AdminEvent> {
        let recv = async { self.inner.rx.lock().await.recv().await };
        let message = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, recv).await.ok()?,
            None => recv.await,
        };
        self.unwrap_message(message?)
    }

    /// Take the next event if one is ready.
    pub fn try_poll(&self) -> Option<AdminEvent> {
        let mut rx = self.inner.rx.try_lock().ok()?;
        let message = rx.try_recv().ok()?;
        self.unwrap_message(message)
    }

    /// Wake one waiter with no event.
    pub fn yield_waiter(&self) {
        let _ = self.inner.tx.send(QueueMessage::Wakeup);
    }

    /// Number of events posted but not yet polled.
    pub fn len(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unwrap_message(&self, message: QueueMessage) -> Option<AdminEvent> {
        match message {
            QueueMessage::Event(event) => {
                self.inner.pending.fetch_sub(1, Ordering::AcqRel);
                Some(*event)
            }
            QueueMessage::Wakeup => None,
        }
    }
}
