//! DescribeConfigs and AlterConfigs response parsing.

use nom::{
    IResult,
    number::complete::{be_i8, be_i32},
};
use nombytes::NomBytes;

use super::{error_of, parse_error_code};
use crate::admin::{ConfigEntry, ConfigResource, ConfigSource, ResourceType};
use crate::error::KafkaCode;
use crate::parser::{parse_array, parse_bool, parse_nullable_string, parse_string};
use crate::protocol::ProtocolResponse;

// ============================================================================
// DescribeConfigs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeConfigsResponseData {
    pub throttle_time_ms: i32,
    pub resources: Vec<DescribeConfigsResourceData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeConfigsResourceData {
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub resource_type: i8,
    pub resource_name: String,
    pub configs: Vec<ConfigEntry>,
}

impl DescribeConfigsResponseData {
    pub fn into_resources(self) -> Vec<ConfigResource> {
        self.resources
            .into_iter()
            .map(|r| ConfigResource {
                resource_type: ResourceType::from_wire(r.resource_type),
                name: r.resource_name,
                entries: r.configs,
                error: error_of(r.error_code, r.error_message),
            })
            .collect()
    }
}

impl ProtocolResponse for DescribeConfigsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.resources.iter().map(|r| r.error_code).collect()
    }
}

pub fn parse_describe_configs_response(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, DescribeConfigsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, resources) = parse_array(|s: NomBytes| parse_describe_resource(s, version))(s)?;
    Ok((
        s,
        DescribeConfigsResponseData {
            throttle_time_ms,
            resources,
        },
    ))
}

fn parse_describe_resource(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, DescribeConfigsResourceData> {
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_nullable_string(s)?;
    let (s, resource_type) = be_i8(s)?;
    let (s, resource_name) = parse_string(s)?;
    let (s, configs) = parse_array(|s: NomBytes| parse_config_entry(s, version))(s)?;
    Ok((
        s,
        DescribeConfigsResourceData {
            error_code,
            error_message,
            resource_type,
            resource_name,
            configs,
        },
    ))
}

fn parse_config_entry(s: NomBytes, version: i16) -> IResult<NomBytes, ConfigEntry> {
    let (s, name) = parse_string(s)?;
    let (s, value) = parse_nullable_string(s)?;
    let (s, is_read_only) = parse_bool(s)?;
    // v0 sends is_default, later versions the full source
    let (s, source, is_default) = if version == 0 {
        let (s, is_default) = parse_bool(s)?;
        let source = if is_default {
            ConfigSource::Default
        } else {
            ConfigSource::Unknown
        };
        (s, source, is_default)
    } else {
        let (s, source) = be_i8(s)?;
        let source = ConfigSource::from_wire(source);
        (s, source, source == ConfigSource::Default)
    };
    let (s, is_sensitive) = parse_bool(s)?;
    let (s, synonyms) = if version >= 1 {
        parse_array(parse_synonym)(s)?
    } else {
        (s, Vec::new())
    };
    Ok((
        s,
        ConfigEntry {
            name,
            value,
            source,
            is_read_only,
            is_default,
            is_sensitive,
            is_synonym: false,
            synonyms,
        },
    ))
}

fn parse_synonym(s: NomBytes) -> IResult<NomBytes, ConfigEntry> {
    let (s, name) = parse_string(s)?;
    let (s, value) = parse_nullable_string(s)?;
    let (s, source) = be_i8(s)?;
    let source = ConfigSource::from_wire(source);
    Ok((
        s,
        ConfigEntry {
            name,
            value,
            source,
            is_default: source == ConfigSource::Default,
            is_synonym: true,
            ..Default::default()
        },
    ))
}

// ============================================================================
// AlterConfigs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterConfigsResponseData {
    pub throttle_time_ms: i32,
    pub resources: Vec<AlterConfigsResourceData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterConfigsResourceData {
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
    pub resource_type: i8,
    pub resource_name: String,
}

impl AlterConfigsResponseData {
    pub fn into_resources(self) -> Vec<ConfigResource> {
        self.resources
            .into_iter()
            .map(|r| ConfigResource {
                resource_type: ResourceType::from_wire(r.resource_type),
                name: r.resource_name,
                entries: Vec::new(),
                error: error_of(r.error_code, r.error_message),
            })
            .collect()
    }
}

impl ProtocolResponse for AlterConfigsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.resources.iter().map(|r| r.error_code).collect()
    }
}

pub fn parse_alter_configs_response(
    s: NomBytes,
    _version: i16,
) -> IResult<NomBytes, AlterConfigsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, resources) = parse_array(parse_alter_resource)(s)?;
    Ok((
        s,
        AlterConfigsResponseData {
            throttle_time_ms,
            resources,
        },
    ))
}

fn parse_alter_resource(s: NomBytes) -> IResult<NomBytes, AlterConfigsResourceData> {
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = parse_nullable_string(s)?;
    let (s, resource_type) = be_i8(s)?;
    let (s, resource_name) = parse_string(s)?;
    Ok((
        s,
        AlterConfigsResourceData {
            error_code,
            error_message,
            resource_type,
            resource_name,
        },
    ))
}
