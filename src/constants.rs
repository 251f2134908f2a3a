//! Centralized protocol and configuration constants.
//!
//! This module consolidates the magic numbers used by the admin client:
//! wire-protocol limits, request defaults, and retry tuning.
//!
//! # Categories
//!
//! - **Protocol Constants**: Kafka wire protocol sizes and limits
//! - **Request Constants**: Timeouts and sentinels carried in requests
//! - **Retry Constants**: Backoff tuning for retried admin requests
//! - **SCRAM Constants**: Credential derivation parameters

// =============================================================================
// Protocol Constants (Kafka Wire Protocol)
// =============================================================================

/// Maximum number of elements accepted in a protocol array.
///
/// A malicious or corrupted payload may declare a huge count; arrays larger
/// than this are rejected as malformed before any element is decoded.
pub const MAX_PROTOCOL_ARRAY_SIZE: i32 = 100_000;

/// Maximum encoded length of a STRING / NULLABLE_STRING field.
///
/// Classic strings carry an i16 length prefix, so this is also the hard
/// protocol limit.
pub const MAX_STRING_SIZE: usize = i16::MAX as usize;

/// Size of the i32 frame length prefix preceding every request and response.
pub const FRAME_SIZE_PREFIX: usize = 4;

/// Byte offset of the correlation id inside a framed request.
///
/// size (4) + api_key (2) + api_version (2).
pub const REQUEST_CORRELATION_ID_OFFSET: usize = 8;

/// Null length sentinel for STRING / BYTES / ARRAY fields.
pub const NULL_LENGTH: i32 = -1;

/// Largest frame the client is willing to decode.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 100 * 1024 * 1024;

// =============================================================================
// Request Constants
// =============================================================================

/// Default client id stamped into request headers.
pub const DEFAULT_CLIENT_ID: &str = "kafkaesque-admin";

/// Default absolute deadline for a single admin request (including retries).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default broker-side operation timeout sent with CreateTopics and friends.
///
/// Zero means the broker returns as soon as the request is accepted.
pub const DEFAULT_OPERATION_TIMEOUT_MS: i32 = 0;

/// Replica id sent by ordinary (non-broker) clients in ListOffsets.
pub const CONSUMER_REPLICA_ID: i32 = -1;

/// ListOffsets timestamp sentinel for the latest offset.
pub const OFFSET_SPEC_LATEST: i64 = -1;

/// ListOffsets timestamp sentinel for the earliest offset.
pub const OFFSET_SPEC_EARLIEST: i64 = -2;

/// Sentinel for "use the broker default" partition count / replication factor.
pub const BROKER_DEFAULT: i32 = -1;

// =============================================================================
// Retry Constants
// =============================================================================

/// Default number of retries per admin request.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Initial backoff before the first retry.
pub const DEFAULT_RETRY_BACKOFF_MIN_MS: u64 = 100;

/// Upper bound on the backoff between retries.
pub const DEFAULT_RETRY_BACKOFF_MAX_MS: u64 = 1_000;

// =============================================================================
// SCRAM Constants
// =============================================================================

/// Random salt length generated when an upsertion does not supply one.
pub const SCRAM_DEFAULT_SALT_LEN: usize = 64;
