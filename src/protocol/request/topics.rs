//! CreateTopics, DeleteTopics and CreatePartitions requests.

use nom::IResult;
use nombytes::NomBytes;

use crate::admin::{NewPartitions, NewTopic};
use crate::encode::RequestBuffer;
use crate::error::{Error, Result};
use crate::protocol::response::{
    CreatePartitionsResponseData, CreateTopicsResponseData, DeleteTopicsResponseData,
    parse_create_partitions_response, parse_create_topics_response, parse_delete_topics_response,
};
use crate::protocol::{ApiKey, ProtocolRequest};

// ============================================================================
// CreateTopics
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateTopicsRequest {
    pub topics: Vec<NewTopic>,
    pub timeout_ms: i32,
    pub validate_only: bool,
}

impl ProtocolRequest for CreateTopicsRequest {
    type Response = CreateTopicsResponseData;

    const API_KEY: ApiKey = ApiKey::CreateTopics;

    fn encode_body(&self, buf: &mut RequestBuffer, version: i16) -> Result<()> {
        if self.validate_only && version < 1 {
            return Err(Error::Unsupported(
                "CreateTopics validate_only requires broker support for v1".to_string(),
            ));
        }

        buf.write_array(&self.topics, |buf, topic| {
            buf.write_string(&topic.name)?;
            buf.write_i32(topic.num_partitions);
            buf.write_i16(topic.replication_factor);
            let assignments: Vec<(i32, &Vec<i32>)> = topic
                .replica_assignment
                .iter()
                .enumerate()
                .map(|(i, brokers)| (i as i32, brokers))
                .collect();
            buf.write_array(&assignments, |buf, (partition, brokers)| {
                buf.write_i32(*partition);
                buf.write_array(brokers.as_slice(), |buf, id| {
                    buf.write_i32(*id);
                    Ok(())
                })
            })?;
            buf.write_array(&topic.configs, |buf, (name, value)| {
                buf.write_string(name)?;
                buf.write_nullable_string(value.as_deref())
            })
        })?;
        buf.write_i32(self.timeout_ms);
        if version >= 1 {
            buf.write_bool(self.validate_only);
        }
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_create_topics_response(s, version)
    }
}

// ============================================================================
// DeleteTopics
// ============================================================================

#[derive(Debug, Clone)]
pub struct DeleteTopicsRequest {
    pub topics: Vec<String>,
    pub timeout_ms: i32,
}

impl ProtocolRequest for DeleteTopicsRequest {
    type Response = DeleteTopicsResponseData;

    const API_KEY: ApiKey = ApiKey::DeleteTopics;

    fn encode_body(&self, buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        buf.write_array(&self.topics, |buf, name| buf.write_string(name))?;
        buf.write_i32(self.timeout_ms);
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_delete_topics_response(s, version)
    }
}

// ============================================================================
// CreatePartitions
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreatePartitionsRequest {
    pub partitions: Vec<NewPartitions>,
    pub timeout_ms: i32,
    pub validate_only: bool,
}

impl ProtocolRequest for CreatePartitionsRequest {
    type Response = CreatePartitionsResponseData;

    const API_KEY: ApiKey = ApiKey::CreatePartitions;

    fn encode_body(&self, buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        buf.write_array(&self.partitions, |buf, p| {
            buf.write_string(&p.topic)?;
            buf.write_i32(p.total_count);
            // no assignment lets the broker place the new partitions
            let assignment = (!p.replica_assignment.is_empty())
                .then_some(p.replica_assignment.as_slice());
            buf.write_nullable_array(assignment, |buf, brokers| {
                buf.write_array(brokers.as_slice(), |buf, id| {
                    buf.write_i32(*id);
                    Ok(())
                })
            })
        })?;
        buf.write_i32(self.timeout_ms);
        buf.write_bool(self.validate_only);
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_create_partitions_response(s, version)
    }
}
