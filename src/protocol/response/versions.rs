//! ApiVersions response parsing.

use nom::{
    IResult,
    number::complete::{be_i16, be_i32},
};
use nombytes::NomBytes;

use crate::error::KafkaCode;
use crate::parser::parse_array;
use super::parse_error_code;
use crate::protocol::ProtocolResponse;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionsResponseData {
    pub error_code: KafkaCode,
    pub api_keys: Vec<ApiVersionData>,
    pub throttle_time_ms: i32,
}

/// One advertised API range, kept as the raw key so unknown APIs survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersionData {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

pub fn parse_api_versions_response(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, ApiVersionsResponseData> {
    let (s, error_code) = parse_error_code(s)?;
    let (s, api_keys) = parse_array(parse_api_version)(s)?;
    // A broker rejecting our version answers in the v0 layout.
    let (s, throttle_time_ms) = if version >= 1 && error_code != KafkaCode::UnsupportedVersion {
        be_i32(s)?
    } else {
        (s, 0)
    };

    Ok((
        s,
        ApiVersionsResponseData {
            error_code,
            api_keys,
            throttle_time_ms,
        },
    ))
}

fn parse_api_version(s: NomBytes) -> IResult<NomBytes, ApiVersionData> {
    let (s, api_key) = be_i16(s)?;
    let (s, min_version) = be_i16(s)?;
    let (s, max_version) = be_i16(s)?;
    Ok((
        s,
        ApiVersionData {
            api_key,
            min_version,
            max_version,
        },
    ))
}

impl ProtocolResponse for ApiVersionsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn request_error(&self) -> Option<(KafkaCode, Option<String>)> {
        self.error_code.is_error().then_some((self.error_code, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response_bytes(error_code: i16, keys: &[(i16, i16, i16)], throttle: Option<i32>) -> Bytes {
        let mut data = Vec::new();
        data.extend_from_slice(&error_code.to_be_bytes());
        data.extend_from_slice(&(keys.len() as i32).to_be_bytes());
        for (k, min, max) in keys {
            data.extend_from_slice(&k.to_be_bytes());
            data.extend_from_slice(&min.to_be_bytes());
            data.extend_from_slice(&max.to_be_bytes());
        }
        if let Some(t) = throttle {
            data.extend_from_slice(&t.to_be_bytes());
        }
        Bytes::from(data)
    }

    #[test]
    fn test_parse_api_versions_v0() {
        let data = response_bytes(0, &[(19, 0, 7), (50, 0, 0)], None);
        let (_, r) = parse_api_versions_response(NomBytes::new(data), 0).unwrap();
        assert_eq!(r.error_code, KafkaCode::None);
        assert_eq!(r.api_keys.len(), 2);
        assert_eq!(
            r.api_keys[0],
            ApiVersionData {
                api_key: 19,
                min_version: 0,
                max_version: 7
            }
        );
        assert!(r.request_error().is_none());
    }

    #[test]
    fn test_parse_api_versions_v1_throttle() {
        let data = response_bytes(0, &[(18, 0, 3)], Some(25));
        let (_, r) = parse_api_versions_response(NomBytes::new(data), 1).unwrap();
        assert_eq!(r.throttle_time_ms, 25);
        assert_eq!(r.throttle_time_ms(), 25);
    }

    #[test]
    fn test_parse_api_versions_error() {
        let data = response_bytes(35, &[(18, 0, 2)], None);
        let (_, r) = parse_api_versions_response(NomBytes::new(data), 0).unwrap();
        assert_eq!(
            r.request_error(),
            Some((KafkaCode::UnsupportedVersion, None))
        );
    }

    #[test]
    fn test_unsupported_version_reply_uses_v0_layout() {
        let data = response_bytes(35, &[(18, 0, 2)], None);
        let (_, r) = parse_api_versions_response(NomBytes::new(data), 2).unwrap();
        assert_eq!(r.error_code, KafkaCode::UnsupportedVersion);
        assert_eq!(r.api_keys.len(), 1);
        assert_eq!(r.throttle_time_ms, 0);
    }
}
