//! DeleteGroups and OffsetDelete response parsing.

use nom::{IResult, number::complete::be_i32};
use nombytes::NomBytes;

use super::{error_of, parse_error_code};
use crate::admin::{GroupResult, TopicPartition};
use crate::error::KafkaCode;
use crate::parser::{parse_array, parse_string};
use crate::protocol::ProtocolResponse;

// ============================================================================
// DeleteGroups
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteGroupsResponseData {
    pub throttle_time_ms: i32,
    pub results: Vec<DeletableGroupResultData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletableGroupResultData {
    pub group_id: String,
    pub error_code: KafkaCode,
}

impl DeleteGroupsResponseData {
    pub fn into_group_results(self) -> Vec<GroupResult> {
        self.results
            .into_iter()
            .map(|r| GroupResult {
                group: r.group_id,
                error: error_of(r.error_code, None),
                partitions: Vec::new(),
            })
            .collect()
    }
}

impl ProtocolResponse for DeleteGroupsResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.results.iter().map(|r| r.error_code).collect()
    }
}

pub fn parse_delete_groups_response(
    s: NomBytes,
    _version: i16,
) -> IResult<NomBytes, DeleteGroupsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, results) = parse_array(parse_deletable_group)(s)?;
    Ok((
        s,
        DeleteGroupsResponseData {
            throttle_time_ms,
            results,
        },
    ))
}

fn parse_deletable_group(s: NomBytes) -> IResult<NomBytes, DeletableGroupResultData> {
    let (s, group_id) = parse_string(s)?;
    let (s, error_code) = parse_error_code(s)?;
    Ok((
        s,
        DeletableGroupResultData {
            group_id,
            error_code,
        },
    ))
}

// ============================================================================
// OffsetDelete
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetDeleteResponseData {
    pub error_code: KafkaCode,
    pub throttle_time_ms: i32,
    pub topics: Vec<OffsetDeleteTopicData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetDeleteTopicData {
    pub name: String,
    pub partitions: Vec<OffsetDeletePartitionData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetDeletePartitionData {
    pub partition_index: i32,
    pub error_code: KafkaCode,
}

impl OffsetDeleteResponseData {
    /// Per-partition outcomes, flattened in response order.
    pub fn into_partitions(self) -> Vec<TopicPartition> {
        self.topics
            .into_iter()
            .flat_map(|topic| {
                let name = topic.name;
                topic.partitions.into_iter().map(move |p| {
                    let mut tp = TopicPartition::new(name.clone(), p.partition_index);
                    tp.error = error_of(p.error_code, None);
                    tp
                })
            })
            .collect()
    }
}

impl ProtocolResponse for OffsetDeleteResponseData {
    fn throttle_time_ms(&self) -> i32 {
        self.throttle_time_ms
    }

    fn request_error(&self) -> Option<(KafkaCode, Option<String>)> {
        self.error_code.is_error().then_some((self.error_code, None))
    }

    fn item_codes(&self) -> Vec<KafkaCode> {
        self.topics
            .iter()
            .flat_map(|t| t.partitions.iter().map(|p| p.error_code))
            .collect()
    }
}

pub fn parse_offset_delete_response(
    s: NomBytes,
    _version: i16,
) -> IResult<NomBytes, OffsetDeleteResponseData> {
    let (s, error_code) = parse_error_code(s)?;
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, topics) = parse_array(parse_offset_delete_topic)(s)?;
    Ok((
        s,
        OffsetDeleteResponseData {
            error_code,
            throttle_time_ms,
            topics,
        },
    ))
}

fn parse_offset_delete_topic(s: NomBytes) -> IResult<NomBytes, OffsetDeleteTopicData> {
    let (s, name) = parse_string(s)?;
    let (s, partitions) = parse_array(parse_offset_delete_partition)(s)?;
    Ok((s, OffsetDeleteTopicData { name, partitions }))
}

fn parse_offset_delete_partition(s: NomBytes) -> IResult<NomBytes, OffsetDeletePartitionData> {
    let (s, partition_index) = be_i32(s)?;
    let (s, error_code) = parse_error_code(s)?;
    Ok((
        s,
        OffsetDeletePartitionData {
            partition_index,
            error_code,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::RequestBuffer;
    use crate::parser::decode;

    #[test]
    fn test_delete_groups() {
        let mut b = RequestBuffer::new();
        b.write_i32(0);
        b.write_i32(2);
        b.write_string("g1").unwrap();
        b.write_i16(0);
        b.write_string("g2").unwrap();
        b.write_i16(68);

        let r = decode(b.freeze(), |s| parse_delete_groups_response(s, 1)).unwrap();
        assert_eq!(r.item_codes(), vec![KafkaCode::None, KafkaCode::NonEmptyGroup]);
        let results = r.into_group_results();
        assert_eq!(results[0].group, "g1");
        assert!(results[0].error.is_none());
        assert_eq!(
            results[1].error.as_ref().unwrap().code,
            KafkaCode::NonEmptyGroup
        );
    }

    #[test]
    fn test_offset_delete() {
        let mut b = RequestBuffer::new();
        b.write_i16(0);
        b.write_i32(0);
        b.write_i32(1);
        b.write_string("t").unwrap();
        b.write_i32(2);
        b.write_i32(0);
        b.write_i16(0);
        b.write_i32(1);
        b.write_i16(86);

        let r = decode(b.freeze(), |s| parse_offset_delete_response(s, 0)).unwrap();
        assert!(r.request_error().is_none());
        let parts = r.into_partitions();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].topic, "t");
        assert!(parts[0].error.is_none());
        assert_eq!(
            parts[1].error.as_ref().unwrap().code,
            KafkaCode::GroupSubscribedToTopic
        );
    }

    #[test]
    fn test_offset_delete_group_error() {
        let mut b = RequestBuffer::new();
        b.write_i16(69);
        b.write_i32(0);
        b.write_i32(0);
        let r = decode(b.freeze(), |s| parse_offset_delete_response(s, 0)).unwrap();
        assert_eq!(r.request_error(), Some((KafkaCode::GroupIdNotFound, None)));
    }
}
