//! DescribeConfigs and AlterConfigs requests.

use nom::IResult;
use nombytes::NomBytes;

use crate::admin::ConfigResource;
use crate::encode::RequestBuffer;
use crate::error::Result;
use crate::protocol::response::{
    AlterConfigsResponseData, DescribeConfigsResponseData, parse_alter_configs_response,
    parse_describe_configs_response,
};
use crate::protocol::{ApiKey, ProtocolRequest};

#[derive(Debug, Clone)]
pub struct DescribeConfigsRequest {
    pub resources: Vec<ConfigResource>,
    pub include_synonyms: bool,
}

impl ProtocolRequest for DescribeConfigsRequest {
    type Response = DescribeConfigsResponseData;

    const API_KEY: ApiKey = ApiKey::DescribeConfigs;

    fn encode_body(&self, buf: &mut RequestBuffer, version: i16) -> Result<()> {
        buf.write_array(&self.resources, |buf, resource| {
            buf.write_i8(resource.resource_type as i8);
            buf.write_string(&resource.name)?;
            // a null key list asks for every config of the resource
            let keys: Vec<&str> = resource.entries.iter().map(|e| e.name.as_str()).collect();
            let keys = (!keys.is_empty()).then_some(keys.as_slice());
            buf.write_nullable_array(keys, |buf, key| buf.write_string(key))
        })?;
        if version >= 1 {
            buf.write_bool(self.include_synonyms);
        }
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_describe_configs_response(s, version)
    }
}

#[derive(Debug, Clone)]
pub struct AlterConfigsRequest {
    pub resources: Vec<ConfigResource>,
    pub validate_only: bool,
}

impl ProtocolRequest for AlterConfigsRequest {
    type Response = AlterConfigsResponseData;

    const API_KEY: ApiKey = ApiKey::AlterConfigs;

    fn encode_body(&self, buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        buf.write_array(&self.resources, |buf, resource| {
            buf.write_i8(resource.resource_type as i8);
            buf.write_string(&resource.name)?;
            buf.write_array(&resource.entries, |buf, entry| {
                buf.write_string(&entry.name)?;
                buf.write_nullable_string(entry.value.as_deref())
            })
        })?;
        buf.write_bool(self.validate_only);
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_alter_configs_response(s, version)
    }
}
