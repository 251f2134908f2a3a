//! ListOffsets response parsing.

use nom::{
    IResult,
    number::complete::{be_i32, be_i64},
};
use nombytes::NomBytes;

use super::{error_of, parse_error_code};
use crate::admin::ListOffsetsResultInfo;
use crate::constants::OFFSET_SPEC_LATEST;
use crate::error::KafkaCode;
use crate::parser::{parse_array, parse_string};
use crate::protocol::ProtocolResponse;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOffsetsResponseData {
    pub throttle_time_ms: i32,
    pub topics: Vec<ListOffsetsTopicData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsTopicData {
    pub name: String,
    pub partitions: Vec<ListOffsetsPartitionData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOffsetsPartitionData {
    pub partition_index: i32,
    pub error_code: KafkaCode,
    pub timestamp: i64,
    pub offset: i64,
}

impl ListOffsetsResponseData {
    pub fn into_results(self) -> Vec<ListOffsetsResultInfo> {
        self.topics
            .into_iter()
            .flat_map(|topic| {
                let name = topic.name;
                topic
                    .partitions
                    .into_iter()
                    .map(move |p| ListOffsetsResultInfo {
                        topic: name.clone(),
                        partition: p.partition_index,
                        offset: p.offset,
                        timestamp: p.timestamp,
                        error: error_of(p.error_code, None),
                    })
            })
            .collect()
    }
}

impl ProtocolResponse for ListOffsetsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.topics
            .iter()
            .flat_map(|t| t.partitions.iter().map(|p| p.error_code))
            .collect()
    }
}

pub fn parse_list_offsets_response(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, ListOffsetsResponseData> {
    let (s, throttle_time_ms) = if version >= 2 { be_i32(s)? } else { (s, 0) };
    let (s, topics) = parse_array(|s: NomBytes| parse_topic(s, version))(s)?;
    Ok((
        s,
        ListOffsetsResponseData {
            throttle_time_ms,
            topics,
        },
    ))
}

fn parse_topic(s: NomBytes, version: i16) -> IResult<NomBytes, ListOffsetsTopicData> {
    let (s, name) = parse_string(s)?;
    let (s, partitions) = parse_array(|s: NomBytes| parse_partition(s, version))(s)?;
    Ok((s, ListOffsetsTopicData { name, partitions }))
}

fn parse_partition(s: NomBytes, version: i16) -> IResult<NomBytes, ListOffsetsPartitionData> {
    let (s, partition_index) = be_i32(s)?;
    let (s, error_code) = parse_error_code(s)?;
    // v0 answers with a list of offsets and no timestamp
    let (s, timestamp, offset) = if version == 0 {
        let (s, offsets) = parse_array(be_i64)(s)?;
        let offset = offsets.first().copied().unwrap_or(OFFSET_SPEC_LATEST);
        (s, -1, offset)
    } else {
        let (s, timestamp) = be_i64(s)?;
        let (s, offset) = be_i64(s)?;
        (s, timestamp, offset)
    };
    Ok((
        s,
        ListOffsetsPartitionData {
            partition_index,
            error_code,
            timestamp,
            offset,
        },
    ))
}
