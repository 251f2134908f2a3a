//! Crate & protocol level errors.
//!
//! # Error Hierarchy
//!
//! - [`Error`]: everything an admin call can fail with, from argument
//!   validation through wire decoding to broker-reported failures.
//! - [`KafkaCode`]: wire protocol error codes, plus the client-local
//!   negative codes used to report failures that never reached a broker.
//!
//! Every [`Error`] maps onto a [`KafkaCode`] through [`Error::code`], which is
//! what the error-action classifier consumes.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::{io, result};
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

/// Admin client errors.
///
/// Request-level failures are reported through this type; per-item failures
/// inside a successful response are carried as
/// [`ItemError`](crate::admin::ItemError) values instead.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
    /// An error in the network.
    #[error("IO error: {0:?}")]
    IoError(io::ErrorKind),

    /// Caller-supplied input was rejected before anything was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No protocol version is supported by both client and broker.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A read needed more bytes than the payload had left.
    #[error("Truncated buffer")]
    TruncatedBuffer,

    /// A field could not be encoded or decoded.
    #[error("Malformed field: {0}")]
    MalformedField(String),

    /// The broker answered with a non-zero request-level error code.
    #[error("Broker: {}", .message.as_deref().unwrap_or(.code.description()))]
    Broker {
        code: KafkaCode,
        message: Option<String>,
    },

    /// Connection lost or the transport failed to deliver the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request deadline expired, possibly while retrying.
    #[error("Timed out{}", .last.map(|c| format!(" (last error: {})", c.description())).unwrap_or_default())]
    Timeout { last: Option<KafkaCode> },

    /// The request was abandoned because the client is shutting down.
    #[error("Cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a broker error from a wire code and optional message.
    pub fn broker(code: KafkaCode, message: Option<String>) -> Self {
        Error::Broker { code, message }
    }

    /// The error code this error is classified as.
    pub fn code(&self) -> KafkaCode {
        match self {
            Error::IoError(_) | Error::Transport(_) => KafkaCode::Transport,
            Error::InvalidArgument(_) | Error::Config(_) => KafkaCode::InvalidArg,
            Error::Unsupported(_) => KafkaCode::UnsupportedFeature,
            Error::TruncatedBuffer | Error::MalformedField(_) => KafkaCode::BadMsg,
            Error::Broker { code, .. } => *code,
            Error::Timeout { .. } => KafkaCode::TimedOut,
            Error::Cancelled => KafkaCode::Destroy,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e.kind())
    }
}

/// Various errors reported by a remote Kafka server, plus client-local codes.
///
/// Negative values below `-100` never travel on the wire; they report
/// failures detected by the client itself.
/// See also [Kafka Errors](http://kafka.apache.org/protocol.html)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, Default)]
#[repr(i16)]
pub enum KafkaCode {
    /// Received message is incorrect or could not be decoded (local).
    BadMsg = -199,
    /// The client is being torn down (local).
    Destroy = -197,
    /// Broker transport failure (local).
    Transport = -195,
    /// Invalid argument or configuration (local).
    InvalidArg = -186,
    /// Operation timed out (local).
    TimedOut = -185,
    /// Feature not supported by the broker (local).
    UnsupportedFeature = -165,
    /// An unexpected server error
    Unknown = -1,
    #[default]
    None = 0,
    /// The requested offset is outside the range of offsets
    /// maintained by the server for the given topic/partition
    OffsetOutOfRange = 1,
    /// This indicates that a message contents does not match its CRC
    CorruptMessage = 2,
    /// This request is for a topic or partition that does not exist
    /// on this broker.
    UnknownTopicOrPartition = 3,
    /// The message has a negative size
    InvalidMessageSize = 4,
    /// This error is thrown if we are in the middle of a leadership
    /// election and there is currently no leader for this partition
    /// and hence it is unavailable for writes.
    LeaderNotAvailable = 5,
    /// This error is thrown if the client attempts to send messages
    /// to a replica that is not the leader for some partition. It
    /// indicates that the clients metadata is out of date.
    NotLeaderForPartition = 6,
    /// This error is thrown if the request exceeds the user-specified
    /// time limit in the request.
    RequestTimedOut = 7,
    /// This is not a client facing error and is used mostly by tools
    /// when a broker is not alive.
    BrokerNotAvailable = 8,
    /// If replica is expected on a broker, but is not (this can be
    /// safely ignored).
    ReplicaNotAvailable = 9,
    /// The server has a configurable maximum message size to avoid
    /// unbounded memory allocation.
    MessageSizeTooLarge = 10,
    /// Internal error code for broker-to-broker communication.
    StaleControllerEpoch = 11,
    /// If you specify a string larger than configured maximum for
    /// offset metadata
    OffsetMetadataTooLarge = 12,
    /// The server disconnected before a response was received.
    NetworkException = 13,
    /// The coordinator is still loading group metadata.
    GroupLoadInProgress = 14,
    /// The offsets topic has not yet been created, or the group
    /// coordinator is not active.
    GroupCoordinatorNotAvailable = 15,
    /// The broker is not the coordinator for this group.
    NotCoordinatorForGroup = 16,
    /// For a request which attempts to access an invalid topic
    /// (e.g. one which has an illegal name).
    InvalidTopic = 17,
    /// If a message batch in a produce request exceeds the maximum
    /// configured segment size.
    RecordListTooLarge = 18,
    /// The number of in-sync replicas is lower than the configured minimum.
    NotEnoughReplicas = 19,
    /// The message was written to the log, but with fewer in-sync
    /// replicas than required.
    NotEnoughReplicasAfterAppend = 20,
    /// The requested requiredAcks is invalid.
    InvalidRequiredAcks = 21,
    /// The generation id provided in the request is not the current
    /// generation.
    IllegalGeneration = 22,
    /// The member's protocol type is not compatible with the group.
    InconsistentGroupProtocol = 23,
    /// The group id is empty or null.
    InvalidGroupId = 24,
    /// The member id is not in the current generation.
    UnknownMemberId = 25,
    /// The requested session timeout is outside the allowed range.
    InvalidSessionTimeout = 26,
    /// The coordinator has begun rebalancing the group.
    RebalanceInProgress = 27,
    /// An offset commit was rejected because of oversize metadata.
    InvalidCommitOffsetSize = 28,
    /// The client is not authorized to access the requested topic.
    TopicAuthorizationFailed = 29,
    /// The client is not authorized to access a particular group id.
    GroupAuthorizationFailed = 30,
    /// The client is not authorized to use an inter-broker or
    /// administrative API.
    ClusterAuthorizationFailed = 31,
    /// The timestamp of the message is out of acceptable range.
    InvalidTimestamp = 32,
    /// The broker does not support the requested SASL mechanism.
    UnsupportedSaslMechanism = 33,
    /// Request is not valid given the current SASL state.
    IllegalSaslState = 34,
    /// The version of API is not supported.
    UnsupportedVersion = 35,
    /// Topic with this name already exists.
    TopicAlreadyExists = 36,
    /// Number of partitions is below 1.
    InvalidPartitions = 37,
    /// Replication factor is below 1 or larger than the number of
    /// available brokers.
    InvalidReplicationFactor = 38,
    /// Replica assignment is invalid.
    InvalidReplicaAssignment = 39,
    /// Configuration is invalid.
    InvalidConfig = 40,
    /// This is not the correct controller for this cluster.
    NotController = 41,
    /// The request is malformed or inconsistent with the broker state.
    InvalidRequest = 42,
    /// The message format version on the broker does not support the request.
    UnsupportedForMessageFormat = 43,
    /// Request parameters do not satisfy the configured policy.
    PolicyViolation = 44,
    /// The producer attempted to use a sequence number outside the valid range.
    OutOfOrderSequenceNumber = 45,
    /// The producer attempted to assign a sequence number that was already used.
    DuplicateSequenceNumber = 46,
    /// Security features are disabled on the broker.
    SecurityDisabled = 54,
    /// The broker did not attempt to execute this operation.
    OperationNotAttempted = 55,
    /// Disk error when trying to access a log file on the broker.
    KafkaStorageError = 56,
    /// SASL Authentication failed.
    SaslAuthenticationFailed = 58,
    /// The group is not empty.
    NonEmptyGroup = 68,
    /// The group id does not exist.
    GroupIdNotFound = 69,
    /// Topic deletion is disabled.
    TopicDeletionDisabled = 73,
    /// The leader epoch in the request is older than the broker's.
    FencedLeaderEpoch = 74,
    /// The leader epoch in the request is newer than the broker's.
    UnknownLeaderEpoch = 75,
    /// The leader high watermark has not caught up.
    OffsetNotAvailable = 78,
    /// The consumer group is actively subscribed to the topic.
    GroupSubscribedToTopic = 86,
    /// The request was throttled by a quota.
    ThrottlingQuotaExceeded = 89,
    /// A requested resource was not found.
    ResourceNotFound = 91,
    /// A request illegally referred to the same resource twice.
    DuplicateResource = 92,
    /// The requested credential would not meet criteria for acceptability.
    UnacceptableCredential = 93,
}

impl KafkaCode {
    /// Decode a wire error code; codes this client does not know map to
    /// [`KafkaCode::Unknown`].
    pub fn from_wire(code: i16) -> Self {
        KafkaCode::from_i16(code).unwrap_or(KafkaCode::Unknown)
    }

    /// Whether this is a client-local code.
    pub fn is_local(self) -> bool {
        (self as i16) < -100
    }

    /// Whether this code reports an error at all.
    pub fn is_error(self) -> bool {
        self != KafkaCode::None
    }

    /// Default human-readable message, used when the broker sends none.
    pub fn description(self) -> &'static str {
        match self {
            KafkaCode::BadMsg => "Local: Bad message format",
            KafkaCode::Destroy => "Local: Broker handle destroyed",
            KafkaCode::Transport => "Local: Broker transport failure",
            KafkaCode::InvalidArg => "Local: Invalid argument or configuration",
            KafkaCode::TimedOut => "Local: Timed out",
            KafkaCode::UnsupportedFeature => "Local: Required feature not supported by broker",
            KafkaCode::Unknown => "Unknown broker error",
            KafkaCode::None => "Success",
            KafkaCode::OffsetOutOfRange => "Offset out of range",
            KafkaCode::CorruptMessage => "Corrupt message",
            KafkaCode::UnknownTopicOrPartition => "Unknown topic or partition",
            KafkaCode::InvalidMessageSize => "Invalid message size",
            KafkaCode::LeaderNotAvailable => "Leader not available",
            KafkaCode::NotLeaderForPartition => "Not leader for partition",
            KafkaCode::RequestTimedOut => "Request timed out",
            KafkaCode::BrokerNotAvailable => "Broker not available",
            KafkaCode::ReplicaNotAvailable => "Replica not available",
            KafkaCode::MessageSizeTooLarge => "Message size too large",
            KafkaCode::StaleControllerEpoch => "Stale controller epoch",
            KafkaCode::OffsetMetadataTooLarge => "Offset metadata string too large",
            KafkaCode::NetworkException => "Broker disconnected before response received",
            KafkaCode::GroupLoadInProgress => "Coordinator load in progress",
            KafkaCode::GroupCoordinatorNotAvailable => "Coordinator not available",
            KafkaCode::NotCoordinatorForGroup => "Not coordinator",
            KafkaCode::InvalidTopic => "Invalid topic",
            KafkaCode::RecordListTooLarge => "Message batch larger than configured segment size",
            KafkaCode::NotEnoughReplicas => "Not enough in-sync replicas",
            KafkaCode::NotEnoughReplicasAfterAppend => {
                "Message(s) written to insufficient number of in-sync replicas"
            }
            KafkaCode::InvalidRequiredAcks => "Invalid required acks value",
            KafkaCode::IllegalGeneration => "Specified group generation id is not valid",
            KafkaCode::InconsistentGroupProtocol => "Inconsistent group protocol",
            KafkaCode::InvalidGroupId => "Invalid group.id",
            KafkaCode::UnknownMemberId => "Unknown member",
            KafkaCode::InvalidSessionTimeout => "Invalid session timeout",
            KafkaCode::RebalanceInProgress => "Group rebalance in progress",
            KafkaCode::InvalidCommitOffsetSize => "Commit offset data size is not valid",
            KafkaCode::TopicAuthorizationFailed => "Topic authorization failed",
            KafkaCode::GroupAuthorizationFailed => "Group authorization failed",
            KafkaCode::ClusterAuthorizationFailed => "Cluster authorization failed",
            KafkaCode::InvalidTimestamp => "Invalid timestamp",
            KafkaCode::UnsupportedSaslMechanism => "Unsupported SASL mechanism",
            KafkaCode::IllegalSaslState => "Request not valid in current SASL state",
            KafkaCode::UnsupportedVersion => "API version not supported",
            KafkaCode::TopicAlreadyExists => "Topic already exists",
            KafkaCode::InvalidPartitions => "Invalid number of partitions",
            KafkaCode::InvalidReplicationFactor => "Invalid replication factor",
            KafkaCode::InvalidReplicaAssignment => "Invalid replica assignment",
            KafkaCode::InvalidConfig => "Configuration is invalid",
            KafkaCode::NotController => "Not controller for cluster",
            KafkaCode::InvalidRequest => "Invalid request",
            KafkaCode::UnsupportedForMessageFormat => {
                "Message format on broker does not support request"
            }
            KafkaCode::PolicyViolation => "Policy violation",
            KafkaCode::OutOfOrderSequenceNumber => "Out of order sequence number",
            KafkaCode::DuplicateSequenceNumber => "Duplicate sequence number",
            KafkaCode::SecurityDisabled => "Security features are disabled",
            KafkaCode::OperationNotAttempted => "Operation not attempted",
            KafkaCode::KafkaStorageError => "Disk error when trying to access log file on disk",
            KafkaCode::SaslAuthenticationFailed => "SASL Authentication failed",
            KafkaCode::NonEmptyGroup => "The group is not empty",
            KafkaCode::GroupIdNotFound => "The group id does not exist",
            KafkaCode::TopicDeletionDisabled => "Topic deletion is disabled",
            KafkaCode::FencedLeaderEpoch => "Leader epoch is older than broker epoch",
            KafkaCode::UnknownLeaderEpoch => "Leader epoch is newer than broker epoch",
            KafkaCode::OffsetNotAvailable => "Leader high watermark is not caught up",
            KafkaCode::GroupSubscribedToTopic => {
                "Group is actively subscribed to the topic"
            }
            KafkaCode::ThrottlingQuotaExceeded => "Throttling quota has been exceeded",
            KafkaCode::ResourceNotFound => "A requested resource was not found",
            KafkaCode::DuplicateResource => "A request illegally referred to the same resource twice",
            KafkaCode::UnacceptableCredential => {
                "Requested credential would not meet criteria for acceptability"
            }
        }
    }
}

impl std::fmt::Display for KafkaCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_io_error() {
        let err = Error::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(err, Error::IoError(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.code(), KafkaCode::Transport);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::TruncatedBuffer.code(), KafkaCode::BadMsg);
        assert_eq!(
            Error::MalformedField("x".to_string()).code(),
            KafkaCode::BadMsg
        );
        assert_eq!(
            Error::InvalidArgument("x".to_string()).code(),
            KafkaCode::InvalidArg
        );
        assert_eq!(
            Error::Unsupported("x".to_string()).code(),
            KafkaCode::UnsupportedFeature
        );
        assert_eq!(Error::Timeout { last: None }.code(), KafkaCode::TimedOut);
        assert_eq!(Error::Cancelled.code(), KafkaCode::Destroy);
        assert_eq!(
            Error::broker(KafkaCode::NotController, None).code(),
            KafkaCode::NotController
        );
    }

    #[test]
    fn test_broker_error_display_uses_description_when_no_message() {
        let err = Error::broker(KafkaCode::TopicAlreadyExists, None);
        assert_eq!(err.to_string(), "Broker: Topic already exists");

        let err = Error::broker(
            KafkaCode::TopicAlreadyExists,
            Some("Topic 'a' already exists.".to_string()),
        );
        assert_eq!(err.to_string(), "Broker: Topic 'a' already exists.");
    }

    #[test]
    fn test_timeout_display_includes_last_error() {
        let err = Error::Timeout {
            last: Some(KafkaCode::RequestTimedOut),
        };
        assert_eq!(err.to_string(), "Timed out (last error: Request timed out)");
        assert_eq!(Error::Timeout { last: None }.to_string(), "Timed out");
    }

    #[test]
    fn test_kafka_code_from_i16() {
        assert_eq!(KafkaCode::from_i16(-1), Some(KafkaCode::Unknown));
        assert_eq!(KafkaCode::from_i16(0), Some(KafkaCode::None));
        assert_eq!(KafkaCode::from_i16(36), Some(KafkaCode::TopicAlreadyExists));
        assert_eq!(KafkaCode::from_i16(91), Some(KafkaCode::ResourceNotFound));
        assert_eq!(
            KafkaCode::from_i16(93),
            Some(KafkaCode::UnacceptableCredential)
        );
    }

    #[test]
    fn test_kafka_code_from_wire_unknown_value() {
        assert_eq!(KafkaCode::from_wire(999), KafkaCode::Unknown);
        assert_eq!(KafkaCode::from_wire(-100), KafkaCode::Unknown);
        assert_eq!(KafkaCode::from_wire(41), KafkaCode::NotController);
    }

    #[test]
    fn test_kafka_code_values() {
        assert_eq!(KafkaCode::BadMsg as i16, -199);
        assert_eq!(KafkaCode::Transport as i16, -195);
        assert_eq!(KafkaCode::TimedOut as i16, -185);
        assert_eq!(KafkaCode::NotLeaderForPartition as i16, 6);
        assert_eq!(KafkaCode::NotController as i16, 41);
        assert_eq!(KafkaCode::ResourceNotFound as i16, 91);
    }

    #[test]
    fn test_kafka_code_is_local() {
        assert!(KafkaCode::Transport.is_local());
        assert!(KafkaCode::BadMsg.is_local());
        assert!(!KafkaCode::Unknown.is_local());
        assert!(!KafkaCode::NotController.is_local());
    }

    #[test]
    fn test_error_clone() {
        let err = Error::broker(KafkaCode::PolicyViolation, Some("nope".to_string()));
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }
}
