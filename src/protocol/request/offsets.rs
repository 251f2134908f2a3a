//! ListOffsets request.

use nom::IResult;
use nombytes::NomBytes;

use super::groups::group_by_topic;
use crate::admin::{IsolationLevel, ListOffsetsRequestInfo};
use crate::constants::CONSUMER_REPLICA_ID;
use crate::encode::RequestBuffer;
use crate::error::Result;
use crate::protocol::response::{ListOffsetsResponseData, parse_list_offsets_response};
use crate::protocol::{ApiKey, ProtocolRequest};

/// Partitions bound for one leader.
#[derive(Debug, Clone)]
pub struct ListOffsetsRequest {
    pub isolation_level: IsolationLevel,
    pub partitions: Vec<ListOffsetsRequestInfo>,
}

impl ProtocolRequest for ListOffsetsRequest {
    type Response = ListOffsetsResponseData;

    const API_KEY: ApiKey = ApiKey::ListOffsets;

    fn encode_body(&self, buf: &mut RequestBuffer, version: i16) -> Result<()> {
        buf.write_i32(CONSUMER_REPLICA_ID);
        if version >= 2 {
            buf.write_i8(self.isolation_level as i8);
        }
        let topics = group_by_topic(&self.partitions, |p| p.topic.as_str());
        buf.write_array(&topics, |buf, (topic, partitions)| {
            buf.write_string(topic)?;
            buf.write_array(partitions.as_slice(), |buf, p| {
                buf.write_i32(p.partition);
                buf.write_i64(p.spec.timestamp());
                if version == 0 {
                    // max_num_offsets
                    buf.write_i32(1);
                }
                Ok(())
            })
        })
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_list_offsets_response(s, version)
    }
}
