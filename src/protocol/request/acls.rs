//! CreateAcls, DescribeAcls and DeleteAcls requests.

use nom::IResult;
use nombytes::NomBytes;

use crate::admin::{AclBinding, AclBindingFilter, ResourcePatternType};
use crate::encode::RequestBuffer;
use crate::error::{Error, Result};
use crate::protocol::response::{
    CreateAclsResponseData, DeleteAclsResponseData, DescribeAclsResponseData,
    parse_create_acls_response, parse_delete_acls_response, parse_describe_acls_response,
};
use crate::protocol::{ApiKey, ProtocolRequest};

/// v0 has no pattern type field and implies literal names. Filters may
/// also ask for any pattern there.
fn write_pattern_type(
    buf: &mut RequestBuffer,
    api_key: ApiKey,
    pattern_type: ResourcePatternType,
    is_filter: bool,
    version: i16,
) -> Result<()> {
    if version >= 1 {
        buf.write_i8(pattern_type as i8);
        return Ok(());
    }
    match pattern_type {
        ResourcePatternType::Literal => Ok(()),
        ResourcePatternType::Any if is_filter => Ok(()),
        other => Err(Error::Unsupported(format!(
            "{} v0 only supports literal resource patterns, got {:?}",
            api_key, other
        ))),
    }
}

fn write_filter(
    buf: &mut RequestBuffer,
    api_key: ApiKey,
    filter: &AclBindingFilter,
    version: i16,
) -> Result<()> {
    buf.write_i8(filter.resource_type as i8);
    buf.write_nullable_string(filter.name.as_deref())?;
    write_pattern_type(buf, api_key, filter.pattern_type, true, version)?;
    buf.write_nullable_string(filter.principal.as_deref())?;
    buf.write_nullable_string(filter.host.as_deref())?;
    buf.write_i8(filter.operation as i8);
    buf.write_i8(filter.permission_type as i8);
    Ok(())
}

// ============================================================================
// CreateAcls
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateAclsRequest {
    pub bindings: Vec<AclBinding>,
}

impl ProtocolRequest for CreateAclsRequest {
    type Response = CreateAclsResponseData;

    const API_KEY: ApiKey = ApiKey::CreateAcls;

    fn encode_body(&self, buf: &mut RequestBuffer, version: i16) -> Result<()> {
        buf.write_array(&self.bindings, |buf, acl| {
            buf.write_i8(acl.resource_type as i8);
            buf.write_string(&acl.name)?;
            write_pattern_type(buf, Self::API_KEY, acl.pattern_type, false, version)?;
            buf.write_string(&acl.principal)?;
            buf.write_string(&acl.host)?;
            buf.write_i8(acl.operation as i8);
            buf.write_i8(acl.permission_type as i8);
            Ok(())
        })
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_create_acls_response(s, version)
    }
}

// ============================================================================
// DescribeAcls
// ============================================================================

#[derive(Debug, Clone)]
pub struct DescribeAclsRequest {
    pub filter: AclBindingFilter,
}

impl ProtocolRequest for DescribeAclsRequest {
    type Response = DescribeAclsResponseData;

    const API_KEY: ApiKey = ApiKey::DescribeAcls;

    fn encode_body(&self, buf: &mut RequestBuffer, version: i16) -> Result<()> {
        write_filter(buf, Self::API_KEY, &self.filter, version)
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_describe_acls_response(s, version)
    }
}

// ============================================================================
// DeleteAcls
// ============================================================================

#[derive(Debug, Clone)]
pub struct DeleteAclsRequest {
    pub filters: Vec<AclBindingFilter>,
}

impl ProtocolRequest for DeleteAclsRequest {
    type Response = DeleteAclsResponseData;

    const API_KEY: ApiKey = ApiKey::DeleteAcls;

    fn encode_body(&self, buf: &mut RequestBuffer, version: i16) -> Result<()> {
        buf.write_array(&self.filters, |buf, filter| {
            write_filter(buf, Self::API_KEY, filter, version)
        })
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_delete_acls_response(s, version)
    }
}
