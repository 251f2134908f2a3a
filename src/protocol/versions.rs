//! API version negotiation.
//!
//! The client carries a fixed table of the versions it can build and parse
//! ([`SUPPORTED_VERSIONS`]); the broker advertises its own ranges through an
//! ApiVersions response ([`BrokerApiVersions`]). Requests go out at the
//! highest version both sides support.
//!
//! # Current Support Matrix
//!
//! | API | Min | Max | Flexible from |
//! |-----|-----|-----|---------------|
//! | ListOffsets | 0 | 2 | - |
//! | ApiVersions | 0 | 2 | - |
//! | CreateTopics | 0 | 4 | - |
//! | DeleteTopics | 0 | 3 | - |
//! | DescribeAcls / CreateAcls / DeleteAcls | 0 | 1 | - |
//! | DescribeConfigs | 0 | 2 | - |
//! | AlterConfigs | 0 | 1 | - |
//! | CreatePartitions | 0 | 1 | - |
//! | DeleteGroups | 0 | 1 | - |
//! | OffsetDelete | 0 | 0 | - |
//! | DescribeUserScramCredentials | 0 | 0 | 0 |
//! | AlterUserScramCredentials | 0 | 0 | 0 |

use std::collections::HashMap;

use super::ApiKey;
use super::response::ApiVersionsResponseData;
use crate::error::{Error, Result};

/// Inclusive version range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub min: i16,
    pub max: i16,
}

impl VersionRange {
    pub const fn new(min: i16, max: i16) -> Self {
        Self { min, max }
    }

    pub const fn contains(&self, version: i16) -> bool {
        version >= self.min && version <= self.max
    }

    /// Overlap of two ranges, `None` when disjoint.
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(VersionRange { min, max })
    }
}

/// Supported API version range for a specific API.
#[derive(Debug, Clone, Copy)]
pub struct SupportedVersion {
    pub api_key: ApiKey,
    pub min_version: i16,
    pub max_version: i16,
}

impl SupportedVersion {
    pub const fn new(api_key: ApiKey, min_version: i16, max_version: i16) -> Self {
        Self {
            api_key,
            min_version,
            max_version,
        }
    }

    pub const fn supports(&self, version: i16) -> bool {
        version >= self.min_version && version <= self.max_version
    }

    pub const fn range(&self) -> VersionRange {
        VersionRange::new(self.min_version, self.max_version)
    }
}

/// Versions this client can build and parse.
pub const SUPPORTED_VERSIONS: &[SupportedVersion] = &[
    SupportedVersion::new(ApiKey::ListOffsets, 0, 2),
    SupportedVersion::new(ApiKey::ApiVersions, 0, 2),
    SupportedVersion::new(ApiKey::CreateTopics, 0, 4),
    SupportedVersion::new(ApiKey::DeleteTopics, 0, 3),
    SupportedVersion::new(ApiKey::DescribeAcls, 0, 1),
    SupportedVersion::new(ApiKey::CreateAcls, 0, 1),
    SupportedVersion::new(ApiKey::DeleteAcls, 0, 1),
    SupportedVersion::new(ApiKey::DescribeConfigs, 0, 2),
    SupportedVersion::new(ApiKey::AlterConfigs, 0, 1),
    SupportedVersion::new(ApiKey::CreatePartitions, 0, 1),
    SupportedVersion::new(ApiKey::DeleteGroups, 0, 1),
    SupportedVersion::new(ApiKey::OffsetDelete, 0, 0),
    SupportedVersion::new(ApiKey::DescribeUserScramCredentials, 0, 0),
    SupportedVersion::new(ApiKey::AlterUserScramCredentials, 0, 0),
];

/// Find the supported version info for a specific API key.
pub fn find_version(api_key: ApiKey) -> Option<&'static SupportedVersion> {
    SUPPORTED_VERSIONS.iter().find(|v| v.api_key == api_key)
}

/// Check if a specific API version is supported by the client.
pub fn is_version_supported(api_key: ApiKey, version: i16) -> bool {
    find_version(api_key)
        .map(|v| v.supports(version))
        .unwrap_or(false)
}

/// Check if an API uses flexible encoding at the given version.
///
/// Flexible encoding was introduced in KIP-482 and affects wire format.
pub fn uses_flexible_encoding(api_key: ApiKey, version: i16) -> bool {
    match api_key {
        ApiKey::ApiVersions => version >= 3,
        ApiKey::ListOffsets => version >= 6,
        ApiKey::CreateTopics => version >= 5,
        ApiKey::DeleteTopics => version >= 4,
        ApiKey::DescribeAcls | ApiKey::CreateAcls | ApiKey::DeleteAcls => version >= 2,
        ApiKey::DescribeConfigs => version >= 4,
        ApiKey::AlterConfigs => version >= 2,
        ApiKey::CreatePartitions => version >= 2,
        ApiKey::DeleteGroups => version >= 2,
        ApiKey::OffsetDelete => false,
        ApiKey::DescribeUserScramCredentials | ApiKey::AlterUserScramCredentials => true,
        ApiKey::Unknown(_) => false,
    }
}

/// Whether the response header carries tagged fields.
///
/// ApiVersions responses always use header v0 so clients can parse them
/// before knowing what the broker supports.
pub fn uses_flexible_response_header(api_key: ApiKey, version: i16) -> bool {
    api_key != ApiKey::ApiVersions && uses_flexible_encoding(api_key, version)
}

/// Pick the highest version supported by both sides.
///
/// Fails with [`Error::Unsupported`] when the ranges do not overlap.
pub fn negotiate(
    api_key: ApiKey,
    broker_min: i16,
    broker_max: i16,
    client_range: VersionRange,
) -> Result<i16> {
    VersionRange::new(broker_min, broker_max)
        .intersect(&client_range)
        .map(|r| r.max)
        .ok_or_else(|| {
            Error::Unsupported(format!(
                "{} requires broker version in {}..={}, broker supports {}..={}",
                api_key, client_range.min, client_range.max, broker_min, broker_max
            ))
        })
}

/// API version ranges advertised by one broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerApiVersions {
    ranges: HashMap<i16, VersionRange>,
}

impl BrokerApiVersions {
    pub fn new(ranges: impl IntoIterator<Item = (ApiKey, VersionRange)>) -> Self {
        Self {
            ranges: ranges
                .into_iter()
                .map(|(k, r)| (i16::from(k), r))
                .collect(),
        }
    }

    pub fn from_response(response: &ApiVersionsResponseData) -> Self {
        Self {
            ranges: response
                .api_keys
                .iter()
                .map(|k| (k.api_key, VersionRange::new(k.min_version, k.max_version)))
                .collect(),
        }
    }

    pub fn range(&self, api_key: ApiKey) -> Option<VersionRange> {
        self.ranges.get(&i16::from(api_key)).copied()
    }

    /// Negotiate `api_key` against the client's supported range.
    pub fn negotiate(&self, api_key: ApiKey) -> Result<i16> {
        let client = find_version(api_key).ok_or_else(|| {
            Error::Unsupported(format!("{} is not supported by this client", api_key))
        })?;
        let broker = self.range(api_key).ok_or_else(|| {
            Error::Unsupported(format!("{} is not supported by broker", api_key))
        })?;
        negotiate(api_key, broker.min, broker.max, client.range())
    }
}
