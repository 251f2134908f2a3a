//! Correlation of responses to outstanding requests.
//!
//! Responses may arrive in any order; each is matched to its waiter by
//! correlation id. Completions for ids with no waiter (late, duplicate or
//! unknown) are dropped with a warning.

use std::sync::atomic::{AtomicI32, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::traits::ResponseSink;
use crate::error::{Error, Result};
use crate::types::CorrelationId;

type Waiter = oneshot::Sender<Result<Bytes>>;

#[derive(Debug, Default)]
pub struct InFlightRequests {
    waiters: DashMap<i32, Waiter>,
    next_id: AtomicI32,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next correlation id, wrapping back to 0 after `i32::MAX`.
    pub fn next_correlation_id(&self) -> CorrelationId {
        let id = self
            .next_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |id| {
                Some(id.checked_add(1).unwrap_or(0))
            })
            .unwrap_or_default();
        CorrelationId::new(id)
    }

    /// Register a waiter for `correlation_id`.
    pub fn register(&self, correlation_id: CorrelationId) -> oneshot::Receiver<Result<Bytes>> {
        let (tx, rx) = oneshot::channel();
        if self.waiters.insert(correlation_id.value(), tx).is_some() {
            warn!(%correlation_id, "Replaced an in-flight request with the same correlation id");
        }
        rx
    }

    /// Forget a waiter whose caller gave up.
    pub fn cancel(&self, correlation_id: CorrelationId) {
        if self.waiters.remove(&correlation_id.value()).is_some() {
            debug!(%correlation_id, "Abandoned in-flight request");
        }
    }

    /// Deliver a response. Returns `false` when no waiter was registered.
    pub fn complete(&self, correlation_id: CorrelationId, response: Result<Bytes>) -> bool {
        match self.waiters.remove(&correlation_id.value()) {
            Some((_, waiter)) => {
                // the waiter may have timed out in the meantime
                let _ = waiter.send(response);
                true
            }
            None => {
                warn!(%correlation_id, "Dropping response for unknown correlation id");
                false
            }
        }
    }

    /// Fail every outstanding request with `error`. Returns how many there were.
    pub fn drain(&self, error: Error) -> usize {
        let ids: Vec<i32> = self.waiters.iter().map(|e| *e.key()).collect();
        let mut drained = 0;
        for id in ids {
            if let Some((_, waiter)) = self.waiters.remove(&id) {
                let _ = waiter.send(Err(error.clone()));
                drained += 1;
            }
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

impl ResponseSink for InFlightRequests {
    fn on_response(&self, correlation_id: CorrelationId, response: Result<Bytes>) {
        self.complete(correlation_id, response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_increase_and_wrap() {
        let inflight = InFlightRequests::new();
        assert_eq!(inflight.next_correlation_id(), CorrelationId::new(0));
        assert_eq!(inflight.next_correlation_id(), CorrelationId::new(1));

        inflight.next_id.store(i32::MAX, Ordering::Release);
        assert_eq!(inflight.next_correlation_id(), CorrelationId::new(i32::MAX));
        assert_eq!(inflight.next_correlation_id(), CorrelationId::new(0));
    }

    #[tokio::test]
    async fn test_out_of_order_completion() {
        let inflight = InFlightRequests::new();
        let a = inflight.register(CorrelationId::new(1));
        let b = inflight.register(CorrelationId::new(2));

        assert!(inflight.complete(CorrelationId::new(2), Ok(Bytes::from_static(b"two"))));
        assert!(inflight.complete(CorrelationId::new(1), Ok(Bytes::from_static(b"one"))));

        assert_eq!(a.await.unwrap().unwrap().as_ref(), b"one");
        assert_eq!(b.await.unwrap().unwrap().as_ref(), b"two");
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_completion_is_dropped() {
        let inflight = InFlightRequests::new();
        let rx = inflight.register(CorrelationId::new(5));
        assert!(inflight.complete(CorrelationId::new(5), Ok(Bytes::new())));
        assert!(!inflight.complete(CorrelationId::new(5), Ok(Bytes::new())));
        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_drain_fails_all_waiters() {
        let inflight = InFlightRequests::new();
        let a = inflight.register(CorrelationId::new(1));
        let b = inflight.register(CorrelationId::new(2));
        assert_eq!(inflight.len(), 2);

        assert_eq!(inflight.drain(Error::Cancelled), 2);
        assert_eq!(a.await.unwrap(), Err(Error::Cancelled));
        assert_eq!(b.await.unwrap(), Err(Error::Cancelled));
    }

    #[test]
    fn test_cancel_forgets_waiter() {
        let inflight = InFlightRequests::new();
        let _rx = inflight.register(CorrelationId::new(3));
        inflight.cancel(CorrelationId::new(3));
        assert!(!inflight.complete(CorrelationId::new(3), Ok(Bytes::new())));
    }
}
