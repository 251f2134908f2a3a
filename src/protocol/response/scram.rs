//! DescribeUserScramCredentials and AlterUserScramCredentials response
//! parsing. Both APIs are flexible from v0.

use nom::{
    IResult,
    number::complete::{be_i8, be_i32},
};
use nombytes::NomBytes;

use super::{error_of, parse_error_code};
use crate::admin::{
    ScramCredentialInfo, ScramMechanism, UserScramCredentialAlterationResult,
    UserScramCredentialsDescription,
};
use crate::error::KafkaCode;
use crate::parser::{
    parse_compact_array, parse_compact_nullable_string, parse_compact_string, skip_tagged_fields,
};
use crate::protocol::ProtocolResponse;

// ============================================================================
// DescribeUserScramCredentials
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeUserScramCredentialsResponseData {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub results: Vec<DescribeUserScramCredentialsResultData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeUserScramCredentialsResultData {
    pub user: String,
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub credential_infos: Vec<ScramCredentialInfo>,
}

impl DescribeUserScramCredentialsResponseData {
    pub fn into_descriptions(self) -> Vec<UserScramCredentialsDescription> {
        self.results
            .into_iter()
            .map(|r| UserScramCredentialsDescription {
                user: r.user,
                error: error_of(r.error_code, r.error_message),
                credential_infos: r.credential_infos,
            })
            .collect()
    }
}

impl ProtocolResponse for DescribeUserScramCredentialsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn request_error(&self) -> Option<(KafkaCode, Option<String>)> {
        self.error_code
            .is_error()
            .then(|| (self.error_code, self.error_message.clone()))
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.results.iter().map(|r| r.error_code).collect()
    }
}

pub fn parse_describe_user_scram_credentials_response(
    s: NomBytes,
    _version: i16,
) -> IResult<NomBytes, DescribeUserScramCredentialsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_compact_nullable_string(s)?;
    let (s, results) = parse_compact_array(parse_describe_result)(s)?;
    let (s, _) = skip_tagged_fields(s)?;
    Ok((
        s,
        DescribeUserScramCredentialsResponseData {
            throttle_time_ms,
            error_code,
            error_message,
            results,
        },
    ))
}

fn parse_describe_result(
    s: NomBytes,
) -> IResult<NomBytes, DescribeUserScramCredentialsResultData> {
    let (s, user) = parse_compact_string(s)?;
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_compact_nullable_string(s)?;
    let (s, credential_infos) = parse_compact_array(parse_credential_info)(s)?;
    let (s, _) = skip_tagged_fields(s)?;
    Ok((
        s,
        DescribeUserScramCredentialsResultData {
            user,
            error_code,
            error_message,
            credential_infos,
        },
    ))
}

fn parse_credential_info(s: NomBytes) -> IResult<NomBytes, ScramCredentialInfo> {
    let (s, mechanism) = be_i8(s)?;
    let (s, iterations) = be_i32(s)?;
    let (s, _) = skip_tagged_fields(s)?;
    Ok((
        s,
        ScramCredentialInfo {
            mechanism: ScramMechanism::from_wire(mechanism),
            iterations,
        },
    ))
}

// ============================================================================
// AlterUserScramCredentials
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterUserScramCredentialsResponseData {
    pub throttle_time_ms: i32,
    pub results: Vec<AlterUserScramCredentialsResultData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterUserScramCredentialsResultData {
    pub user: String,
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
}

impl AlterUserScramCredentialsResponseData {
    /// Results in broker order. The broker reports one result per distinct
    /// user, not one per alteration.
    pub fn into_alteration_results(self) -> Vec<UserScramCredentialAlterationResult> {
        self.results
            .into_iter()
            .map(|r| UserScramCredentialAlterationResult {
                user: r.user,
                error: error_of(r.error_code, r.error_message),
            })
            .collect()
    }
}

impl ProtocolResponse for AlterUserScramCredentialsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.results.iter().map(|r| r.error_code).collect()
    }
}

pub fn parse_alter_user_scram_credentials_response(
    s: NomBytes,
    _version: i16,
) -> IResult<NomBytes, AlterUserScramCredentialsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, results) = parse_compact_array(parse_alter_result)(s)?;
    let (s, _) = skip_tagged_fields(s)?;
    Ok((
        s,
        AlterUserScramCredentialsResponseData {
            throttle_time_ms,
            results,
        },
    ))
}

fn parse_alter_result(s: NomBytes) -> IResult<NomBytes, AlterUserScramCredentialsResultData> {
    let (s, user) = parse_compact_string(s)?;
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_compact_nullable_string(s)?;
    let (s, _) = skip_tagged_fields(s)?;
    Ok((
        s,
        AlterUserScramCredentialsResultData {
            user,
            error_code,
            error_message,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::RequestBuffer;
    use crate::error::Error;
    use crate::parser::decode;

    #[test]
    fn test_describe_scram_credentials() {
        let mut b = RequestBuffer::new();
        b.write_i32(0);
        b.write_i16(0);
        b.write_compact_nullable_string(None).unwrap();
        b.write_unsigned_varint(3);
        // broker: one SHA-512 credential
        b.write_compact_string("broker").unwrap();
        b.write_i16(0);
        b.write_compact_nullable_string(None).unwrap();
        b.write_unsigned_varint(2);
        b.write_i8(2);
        b.write_i32(10000);
        b.write_empty_tagged_fields();
        b.write_empty_tagged_fields();
        // unknown user
        b.write_compact_string("nobody").unwrap();
        b.write_i16(91);
        b.write_compact_nullable_string(Some("not found")).unwrap();
        b.write_unsigned_varint(1);
        b.write_empty_tagged_fields();
        b.write_empty_tagged_fields();

        let r = decode(b.freeze(), |s| {
            parse_describe_user_scram_credentials_response(s, 0)
        })
        .unwrap();
        assert!(r.request_error().is_none());
        let descriptions = r.into_descriptions();
        assert_eq!(descriptions.len(), 2);
        assert_eq!(descriptions[0].user, "broker");
        assert_eq!(
            descriptions[0].credential_infos,
            vec![ScramCredentialInfo {
                mechanism: ScramMechanism::Sha512,
                iterations: 10000
            }]
        );
        let err = descriptions[1].error.as_ref().unwrap();
        assert_eq!(err.code, KafkaCode::ResourceNotFound);
        assert_eq!(err.message, "not found");
    }

    #[test]
    fn test_describe_scram_request_error() {
        let mut b = RequestBuffer::new();
        b.write_i32(0);
        b.write_i16(31);
        b.write_compact_nullable_string(Some("denied")).unwrap();
        b.write_unsigned_varint(1);
        b.write_empty_tagged_fields();
        let r = decode(b.freeze(), |s| {
            parse_describe_user_scram_credentials_response(s, 0)
        })
        .unwrap();
        assert_eq!(
            r.request_error(),
            Some((
                KafkaCode::ClusterAuthorizationFailed,
                Some("denied".to_string())
            ))
        );
    }

    #[test]
    fn test_alter_scram_results() {
        let mut b = RequestBuffer::new();
        b.write_i32(0);
        b.write_unsigned_varint(3);
        b.write_compact_string("a").unwrap();
        b.write_i16(0);
        b.write_compact_nullable_string(None).unwrap();
        b.write_empty_tagged_fields();
        b.write_compact_string("b").unwrap();
        b.write_i16(91);
        b.write_compact_nullable_string(None).unwrap();
        b.write_empty_tagged_fields();
        b.write_empty_tagged_fields();

        let r = decode(b.freeze(), |s| {
            parse_alter_user_scram_credentials_response(s, 0)
        })
        .unwrap();
        let results = r.into_alteration_results();
        assert!(results[0].error.is_none());
        assert_eq!(
            results[1].error.as_ref().unwrap().message,
            KafkaCode::ResourceNotFound.description()
        );
    }

    #[test]
    fn test_alter_scram_truncated() {
        let mut b = RequestBuffer::new();
        b.write_i32(0);
        b.write_unsigned_varint(5);
        b.write_compact_string("a").unwrap();
        let err = decode(b.freeze(), |s| {
            parse_alter_user_scram_credentials_response(s, 0)
        })
        .unwrap_err();
        assert_eq!(err, Error::TruncatedBuffer);
    }
}
