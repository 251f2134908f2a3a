//! Kafka wire protocol for admin requests.
//!
//! Requests are framed as
//!
//! ```text
//! size:i32 | api_key:i16 | api_version:i16 | correlation_id:i32 | client_id:nullable_string
//!          | [tagged_fields (flexible versions)] | body
//! ```
//!
//! and responses arrive (with the size prefix already stripped by the
//! transport) as `correlation_id:i32 | [tagged_fields] | body`.
//!
//! Each admin API has a request type in [`request`] implementing
//! [`ProtocolRequest`] and a response type in [`response`] implementing
//! [`ProtocolResponse`].

pub mod actions;
pub mod request;
pub mod response;
pub mod versions;

use bytes::Bytes;
use nom::{IResult, number::complete::be_i32};
use nombytes::NomBytes;

use crate::constants::{FRAME_SIZE_PREFIX, REQUEST_CORRELATION_ID_OFFSET};
use crate::encode::{PatchOffset, RequestBuffer};
use crate::error::{Error, KafkaCode, Result};
use crate::parser::skip_tagged_fields;
use crate::types::CorrelationId;

/// API keys for the admin subset of the Kafka protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKey {
    ListOffsets,
    ApiVersions,
    CreateTopics,
    DeleteTopics,
    DescribeAcls,
    CreateAcls,
    DeleteAcls,
    DescribeConfigs,
    AlterConfigs,
    CreatePartitions,
    DeleteGroups,
    OffsetDelete,
    DescribeUserScramCredentials,
    AlterUserScramCredentials,
    Unknown(i16),
}

impl From<i16> for ApiKey {
    fn from(value: i16) -> Self {
        match value {
            2 => ApiKey::ListOffsets,
            18 => ApiKey::ApiVersions,
            19 => ApiKey::CreateTopics,
            20 => ApiKey::DeleteTopics,
            29 => ApiKey::DescribeAcls,
            30 => ApiKey::CreateAcls,
            31 => ApiKey::DeleteAcls,
            32 => ApiKey::DescribeConfigs,
            33 => ApiKey::AlterConfigs,
            37 => ApiKey::CreatePartitions,
            42 => ApiKey::DeleteGroups,
            47 => ApiKey::OffsetDelete,
            50 => ApiKey::DescribeUserScramCredentials,
            51 => ApiKey::AlterUserScramCredentials,
            n => ApiKey::Unknown(n),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::ListOffsets => 2,
            ApiKey::ApiVersions => 18,
            ApiKey::CreateTopics => 19,
            ApiKey::DeleteTopics => 20,
            ApiKey::DescribeAcls => 29,
            ApiKey::CreateAcls => 30,
            ApiKey::DeleteAcls => 31,
            ApiKey::DescribeConfigs => 32,
            ApiKey::AlterConfigs => 33,
            ApiKey::CreatePartitions => 37,
            ApiKey::DeleteGroups => 42,
            ApiKey::OffsetDelete => 47,
            ApiKey::DescribeUserScramCredentials => 50,
            ApiKey::AlterUserScramCredentials => 51,
            ApiKey::Unknown(n) => n,
        }
    }
}

impl ApiKey {
    /// Returns a static string name for this API key.
    ///
    /// For Unknown variants, returns "Unknown" (not the numeric value).
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKey::ListOffsets => "ListOffsets",
            ApiKey::ApiVersions => "ApiVersions",
            ApiKey::CreateTopics => "CreateTopics",
            ApiKey::DeleteTopics => "DeleteTopics",
            ApiKey::DescribeAcls => "DescribeAcls",
            ApiKey::CreateAcls => "CreateAcls",
            ApiKey::DeleteAcls => "DeleteAcls",
            ApiKey::DescribeConfigs => "DescribeConfigs",
            ApiKey::AlterConfigs => "AlterConfigs",
            ApiKey::CreatePartitions => "CreatePartitions",
            ApiKey::DeleteGroups => "DeleteGroups",
            ApiKey::OffsetDelete => "OffsetDelete",
            ApiKey::DescribeUserScramCredentials => "DescribeUserScramCredentials",
            ApiKey::AlterUserScramCredentials => "AlterUserScramCredentials",
            ApiKey::Unknown(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request type the admin client can send.
pub trait ProtocolRequest: Send + Sync + 'static {
    type Response: ProtocolResponse + Send + 'static;

    const API_KEY: ApiKey;

    /// Write the request body for `version` (header excluded).
    fn encode_body(&self, buf: &mut RequestBuffer, version: i16) -> Result<()>;

    /// Parse the response body for `version` (header excluded).
    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response>;
}

/// Error information the dispatcher needs from a parsed response.
pub trait ProtocolResponse {
    fn throttle_time_ms(&self) -> i32 {
        0
    }

    /// Error that applies to the whole request, if the response has one.
    fn request_error(&self) -> Option<(KafkaCode, Option<String>)> {
        None
    }

    /// Per-item error codes, in response order.
    fn item_codes(&self) -> Vec<KafkaCode> {
        Vec::new()
    }
}

/// Request header v1 (v2 for flexible versions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader<'a> {
    pub api_key: ApiKey,
    pub api_version: i16,
    pub correlation_id: CorrelationId,
    pub client_id: Option<&'a str>,
}

/// A fully serialized request, ready to send and to re-send.
#[derive(Debug, Clone)]
pub struct FramedRequest {
    buf: RequestBuffer,
    correlation_at: PatchOffset,
    api_key: ApiKey,
    api_version: i16,
    correlation_id: CorrelationId,
}

impl FramedRequest {
    pub fn api_key(&self) -> ApiKey {
        self.api_key
    }

    pub fn api_version(&self) -> i16 {
        self.api_version
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Stamp a new correlation id, leaving the rest of the payload untouched.
    pub fn restamp(&mut self, correlation_id: CorrelationId) -> Result<()> {
        self.buf
            .patch_i32(self.correlation_at, correlation_id.value())?;
        self.correlation_id = correlation_id;
        Ok(())
    }

    /// Bytes to hand to the transport, size prefix included.
    pub fn payload(&self) -> Bytes {
        Bytes::copy_from_slice(self.buf.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Serialize header and body into a size-prefixed frame.
pub fn encode_request<F>(
    header: &RequestHeader<'_>,
    flexible: bool,
    max_string_size: usize,
    body: F,
) -> Result<FramedRequest>
where
    F: FnOnce(&mut RequestBuffer) -> Result<()>,
{
    let mut buf = RequestBuffer::with_max_string_size(max_string_size);
    let size_at = buf.reserve_i32();
    buf.write_i16(header.api_key.into());
    buf.write_i16(header.api_version);
    let correlation_at = buf.reserve_i32();
    debug_assert_eq!(correlation_at.position(), REQUEST_CORRELATION_ID_OFFSET);
    buf.patch_i32(correlation_at, header.correlation_id.value())?;
    // client_id keeps the classic encoding even in header v2
    buf.write_nullable_string(header.client_id)?;
    if flexible {
        buf.write_empty_tagged_fields();
    }

    body(&mut buf)?;

    let size = i32::try_from(buf.len() - FRAME_SIZE_PREFIX)
        .map_err(|_| Error::MalformedField(format!("request of {} bytes is too large", buf.len())))?;
    buf.patch_i32(size_at, size)?;

    Ok(FramedRequest {
        buf,
        correlation_at,
        api_key: header.api_key,
        api_version: header.api_version,
        correlation_id: header.correlation_id,
    })
}

/// Response header v0 (v1 adds tagged fields for flexible versions).
pub fn parse_response_header(s: NomBytes, flexible: bool) -> IResult<NomBytes, CorrelationId> {
    let (s, correlation_id) = be_i32(s)?;
    let s = if flexible {
        let (s, _) = skip_tagged_fields(s)?;
        s
    } else {
        s
    };
    Ok((s, CorrelationId::new(correlation_id)))
}
