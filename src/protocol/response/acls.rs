//! CreateAcls, DescribeAcls and DeleteAcls response parsing.

use nom::{
    IResult,
    number::complete::{be_i8, be_i32},
};
use nombytes::NomBytes;

use super::{error_of, parse_error_code};
use crate::admin::{
    AclBinding, AclOperation, AclPermissionType, AclResult, DeleteAclsResult, MatchingAcl,
    ResourcePatternType, ResourceType,
};
use crate::error::KafkaCode;
use crate::parser::{parse_array, parse_nullable_string, parse_string};
use crate::protocol::ProtocolResponse;

/// Pattern type as sent on the wire; v0 only knows literal patterns.
fn parse_pattern_type(s: NomBytes, version: i16) -> IResult<NomBytes, ResourcePatternType> {
    if version >= 1 {
        let (s, pattern_type) = be_i8(s)?;
        Ok((s, ResourcePatternType::from_wire(pattern_type)))
    } else {
        Ok((s, ResourcePatternType::Literal))
    }
}

// ============================================================================
// CreateAcls
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateAclsResponseData {
    pub throttle_time_ms: i32,
    pub results: Vec<AclCreationResultData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclCreationResultData {
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
}

impl CreateAclsResponseData {
    pub fn into_acl_results(self) -> Vec<AclResult> {
        self.results
            .into_iter()
            .map(|r| AclResult {
                error: error_of(r.error_code, r.error_message),
            })
            .collect()
    }
}

impl ProtocolResponse for CreateAclsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.results.iter().map(|r| r.error_code).collect()
    }
}

pub fn parse_create_acls_response(
    s: NomBytes,
    _version: i16,
) -> IResult<NomBytes, CreateAclsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, results) = parse_array(parse_creation_result)(s)?;
    Ok((
        s,
        CreateAclsResponseData {
            throttle_time_ms,
            results,
        },
    ))
}

fn parse_creation_result(s: NomBytes) -> IResult<NomBytes, AclCreationResultData> {
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_nullable_string(s)?;
    Ok((
        s,
        AclCreationResultData {
            error_code,
            error_message,
        },
    ))
}

// ============================================================================
// DescribeAcls
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeAclsResponseData {
    pub throttle_time_ms: i32,
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub resources: Vec<AclResourceData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclResourceData {
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub pattern_type: ResourcePatternType,
    pub acls: Vec<AclDescriptionData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclDescriptionData {
    pub principal: String,
    pub host: String,
    pub operation: AclOperation,
    pub permission_type: AclPermissionType,
}

impl DescribeAclsResponseData {
    /// Flatten resources into one binding per ACL, in response order.
    pub fn into_bindings(self) -> Vec<AclBinding> {
        self.resources
            .into_iter()
            .flat_map(|resource| {
                let AclResourceData {
                    resource_type,
                    resource_name,
                    pattern_type,
                    acls,
                } = resource;
                acls.into_iter().map(move |acl| AclBinding {
                    resource_type,
                    name: resource_name.clone(),
                    pattern_type,
                    principal: acl.principal,
                    host: acl.host,
                    operation: acl.operation,
                    permission_type: acl.permission_type,
                })
            })
            .collect()
    }
}

impl ProtocolResponse for DescribeAclsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn request_error(&self) -> Option<(KafkaCode, Option<String>)> {
        self.error_code
            .is_error()
            .then(|| (self.error_code, self.error_message.clone()))
    }
}

pub fn parse_describe_acls_response(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, DescribeAclsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_nullable_string(s)?;
    let (s, resources) = parse_array(|s: NomBytes| parse_acl_resource(s, version))(s)?;
    Ok((
        s,
        DescribeAclsResponseData {
            throttle_time_ms,
            error_code,
            error_message,
            resources,
        },
    ))
}

fn parse_acl_resource(s: NomBytes, version: i16) -> IResult<NomBytes, AclResourceData> {
    let (s, resource_type) = be_i8(s)?;
    let (s, resource_name) = parse_string(s)?;
    let (s, pattern_type) = parse_pattern_type(s, version)?;
    let (s, acls) = parse_array(parse_acl_description)(s)?;
    Ok((
        s,
        AclResourceData {
            resource_type: ResourceType::from_wire(resource_type),
            resource_name,
            pattern_type,
            acls,
        },
    ))
}

fn parse_acl_description(s: NomBytes) -> IResult<NomBytes, AclDescriptionData> {
    let (s, principal) = parse_string(s)?;
    let (s, host) = parse_string(s)?;
    let (s, operation) = be_i8(s)?;
    let (s, permission_type) = be_i8(s)?;
    Ok((
        s,
        AclDescriptionData {
            principal,
            host,
            operation: AclOperation::from_wire(operation),
            permission_type: AclPermissionType::from_wire(permission_type),
        },
    ))
}

// ============================================================================
// DeleteAcls
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteAclsResponseData {
    pub throttle_time_ms: i32,
    pub filter_results: Vec<DeleteAclsFilterResultData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAclsFilterResultData {
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub matching_acls: Vec<DeleteAclsMatchingAclData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAclsMatchingAclData {
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub binding: AclBinding,
}

impl DeleteAclsResponseData {
    pub fn into_delete_results(self) -> Vec<DeleteAclsResult> {
        self.filter_results
            .into_iter()
            .map(|f| DeleteAclsResult {
                error: error_of(f.error_code, f.error_message),
                matching_acls: f
                    .matching_acls
                    .into_iter()
                    .map(|m| MatchingAcl {
                        error: error_of(m.error_code, m.error_message),
                        binding: m.binding,
                    })
                    .collect(),
            })
            .collect()
    }
}

impl ProtocolResponse for DeleteAclsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.filter_results.iter().map(|f| f.error_code).collect()
    }
}

pub fn parse_delete_acls_response(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, DeleteAclsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, filter_results) = parse_array(|s: NomBytes| parse_filter_result(s, version))(s)?;
    Ok((
        s,
        DeleteAclsResponseData {
            throttle_time_ms,
            filter_results,
        },
    ))
}

fn parse_filter_result(s: NomBytes, version: i16) -> IResult<NomBytes, DeleteAclsFilterResultData> {
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_nullable_string(s)?;
    let (s, matching_acls) = parse_array(|s: NomBytes| parse_matching_acl(s, version))(s)?;
    Ok((
        s,
        DeleteAclsFilterResultData {
            error_code,
            error_message,
            matching_acls,
        },
    ))
}

fn parse_matching_acl(s: NomBytes, version: i16) -> IResult<NomBytes, DeleteAclsMatchingAclData> {
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_nullable_string(s)?;
    let (s, resource_type) = be_i8(s)?;
    let (s, name) = parse_string(s)?;
    let (s, pattern_type) = parse_pattern_type(s, version)?;
    let (s, acl) = parse_acl_description(s)?;
    Ok((
        s,
        DeleteAclsMatchingAclData {
            error_code,
            error_message,
            binding: AclBinding {
                resource_type: ResourceType::from_wire(resource_type),
                name,
                pattern_type,
                principal: acl.principal,
                host: acl.host,
                operation: acl.operation,
                permission_type: acl.permission_type,
            },
        },
    ))
}
