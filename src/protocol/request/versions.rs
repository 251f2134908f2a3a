//! ApiVersions request.

use nom::IResult;
use nombytes::NomBytes;

use crate::encode::RequestBuffer;
use crate::error::Result;
use crate::protocol::response::{ApiVersionsResponseData, parse_api_versions_response};
use crate::protocol::{ApiKey, ProtocolRequest};

/// ApiVersions has an empty body up to v2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiVersionsRequest;

impl ProtocolRequest for ApiVersionsRequest {
    type Response = ApiVersionsResponseData;

    const API_KEY: ApiKey = ApiKey::ApiVersions;

    fn encode_body(&self, _buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_api_versions_response(s, version)
    }
}
