//! Collaborator traits the admin client is driven through.
//!
//! The client never opens sockets or tracks cluster metadata itself. It
//! asks a [`BrokerResolver`] which broker should receive a request, hands
//! the serialized frame to a [`BrokerTransport`], and gets the response back
//! through a [`ResponseSink`]. When a broker reports stale metadata the
//! client pokes the [`MetadataRefresher`] and resolves again.
//!
//! # Example: In-memory transport for testing
//!
//! ```text
//! use kafkaesque_admin::client::{BrokerTransport, OutboundRequest, ResponseSink};
//!
//! struct Loopback;
//!
//! impl BrokerTransport for Loopback {
//!     fn send(&self, broker, request, sink) -> Result<()> {
//!         sink.on_response(request.correlation_id, Ok(canned_response()));
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::protocol::ApiKey;
use crate::types::{BrokerId, CorrelationId};

/// Which broker a request must go to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestTarget {
    /// The cluster controller (topic and SCRAM operations).
    Controller,
    /// Any reachable broker (configs, ACLs).
    AnyBroker,
    /// The coordinator of a consumer group.
    Coordinator(String),
    /// The current leader of a partition.
    Leader { topic: String, partition: i32 },
    /// An explicit broker, from [`AdminOptions::set_broker`](crate::admin::AdminOptions::set_broker).
    Broker(BrokerId),
}

impl std::fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestTarget::Controller => f.write_str("controller"),
            RequestTarget::AnyBroker => f.write_str("any broker"),
            RequestTarget::Coordinator(group) => write!(f, "coordinator for {}", group),
            RequestTarget::Leader { topic, partition } => {
                write!(f, "leader for {} [{}]", topic, partition)
            }
            RequestTarget::Broker(id) => write!(f, "broker {}", id),
        }
    }
}

/// A framed request handed to the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub correlation_id: CorrelationId,
    pub api_key: ApiKey,
    pub api_version: i16,
    /// Size-prefixed frame, header included.
    pub payload: Bytes,
}

/// Receives the outcome of a sent request.
pub trait ResponseSink: Send + Sync {
    /// Deliver the response body for `correlation_id`, size prefix stripped
    /// and response header included.
    ///
    /// Called exactly once per accepted request. Connection loss is reported
    /// as an `Err` carrying [`Error::Transport`](crate::error::Error::Transport).
    fn on_response(&self, correlation_id: CorrelationId, response: Result<Bytes>);
}

/// Moves bytes to and from brokers.
pub trait BrokerTransport: Send + Sync {
    /// Queue `request` for `broker`. An `Err` here means the request was
    /// never accepted and `sink` will not be called.
    fn send(
        &self,
        broker: BrokerId,
        request: OutboundRequest,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<()>;
}

/// Maps a [`RequestTarget`] to a broker using current metadata.
#[async_trait]
pub trait BrokerResolver: Send + Sync {
    async fn resolve(&self, target: &RequestTarget) -> Result<BrokerId>;
}

/// Requests a metadata refresh. Fire and forget.
pub trait MetadataRefresher: Send + Sync {
    fn refresh(&self, topics: &[String], force: bool, reason: &str);
}
