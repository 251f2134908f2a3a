//! # Kafkaesque Admin
//! Rust-native core of a Kafka-compatible admin client.
//!
//! This crate speaks the admin subset of the Apache Kafka wire protocol:
//! topic, partition, config, ACL, consumer group, offset and SCRAM credential
//! management. It builds and parses the requests, negotiates API versions with
//! each broker, decides what to do about every error code, and delivers one
//! result event per call.
//!
//! Sockets and cluster metadata stay outside the crate. Plug them in through
//! the [`BrokerTransport`](client::BrokerTransport),
//! [`BrokerResolver`](client::BrokerResolver) and
//! [`MetadataRefresher`](client::MetadataRefresher) traits.
//!
//! # Layout
//! - [`protocol`]: request builders, response parsers, version negotiation
//!   and the error-action classifier.
//! - [`admin`]: the command and result types callers work with.
//! - [`client`]: [`AdminClient`](client::AdminClient) and the request pipeline.
//! - [`queue`]: the result delivery queue.
//!
//! ## Getting started
//! ```rust,no_run
//! use std::sync::Arc;
//! use kafkaesque_admin::prelude::*;
//!
//! # async fn run(
//! #     transport: Arc<dyn BrokerTransport>,
//! #     resolver: Arc<dyn BrokerResolver>,
//! #     refresher: Arc<dyn MetadataRefresher>,
//! # ) -> Result<()> {
//! let client = AdminClient::new(AdminClientConfig::default(), transport, resolver, refresher)?;
//!
//! let alteration = UserScramCredentialAlteration::upsertion(
//!     "alice",
//!     ScramMechanism::Sha512,
//!     10_000,
//!     b"secret",
//!     None,
//! )?;
//! client.alter_user_scram_credentials(vec![alteration], &AdminOptions::new(), None)?;
//!
//! if let Some(event) = client.queue().poll(None).await {
//!     for item in event.result.into_alter_user_scram_credentials().unwrap_or_default().items() {
//!         println!("{}: {:?}", item.user, item.error);
//!     }
//! }
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)
//! - [KIP-554: SCRAM credential admin APIs](https://cwiki.apache.org/confluence/display/KAFKA/KIP-554%3A+Add+Broker-side+SCRAM+Config+API)

#![forbid(unsafe_code)]

pub mod encode;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod types;

pub mod admin;
pub mod client;
pub mod constants;
pub mod metrics;
pub mod queue;
pub mod telemetry;

pub mod prelude {
    //! Main export of admin client structures.
    pub use crate::admin::*;
    pub use crate::client::{
        AdminClient, AdminClientConfig, BrokerResolver, BrokerTransport, MetadataRefresher,
        OutboundRequest, RequestTarget, ResponseSink,
    };
    pub use crate::error::{Error, KafkaCode, Result};
    pub use crate::protocol::ApiKey;
    pub use crate::protocol::actions::ErrorAction;
    pub use crate::queue::ResultQueue;
    pub use crate::types::{BrokerId, CorrelationId};
}
