//! Consumer group and offset types.

use super::result::ItemError;
use crate::constants::{OFFSET_SPEC_EARLIEST, OFFSET_SPEC_LATEST};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub error: Option<ItemError>,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset: OFFSET_SPEC_LATEST,
            error: None,
        }
    }
}

/// Per-group outcome of DeleteGroups and DeleteConsumerGroupOffsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResult {
    pub group: String,
    pub error: Option<ItemError>,
    pub partitions: Vec<TopicPartition>,
}

/// Committed offsets to delete for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConsumerGroupOffsets {
    pub group: String,
    pub partitions: Vec<TopicPartition>,
}

impl DeleteConsumerGroupOffsets {
    pub fn new(group: impl Into<String>, partitions: Vec<TopicPartition>) -> Result<Self> {
        let group = group.into();
        if group.is_empty() {
            return Err(Error::InvalidArgument(
                "group id must not be empty".to_string(),
            ));
        }
        if partitions.is_empty() {
            return Err(Error::InvalidArgument(
                "no partitions specified".to_string(),
            ));
        }
        check_duplicate_partitions(&partitions)?;
        Ok(Self { group, partitions })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum IsolationLevel {
    #[default]
    ReadUncommitted = 0,
    ReadCommitted = 1,
}

/// Which offset ListOffsets should look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSpec {
    Earliest,
    Latest,
    /// First offset whose timestamp is at or after this many ms since epoch.
    Timestamp(i64),
}

impl OffsetSpec {
    /// The timestamp value sent on the wire.
    pub fn timestamp(self) -> i64 {
        match self {
            OffsetSpec::Earliest => OFFSET_SPEC_EARLIEST,
            OffsetSpec::Latest => OFFSET_SPEC_LATEST,
            OffsetSpec::Timestamp(ts) => ts,
        }
    }
}

/// One ListOffsets lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsRequestInfo {
    pub topic: String,
    pub partition: i32,
    pub spec: OffsetSpec,
}

impl ListOffsetsRequestInfo {
    pub fn new(topic: impl Into<String>, partition: i32, spec: OffsetSpec) -> Result<Self> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(Error::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        if partition < 0 {
            return Err(Error::InvalidArgument(format!(
                "invalid partition {} for topic {}",
                partition, topic
            )));
        }
        if let OffsetSpec::Timestamp(ts) = spec
            && ts < 0
        {
            return Err(Error::InvalidArgument(format!(
                "invalid timestamp {} for {} [{}]",
                ts, topic, partition
            )));
        }
        Ok(Self {
            topic,
            partition,
            spec,
        })
    }
}

/// One ListOffsets result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOffsetsResultInfo {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: i64,
    pub error: Option<ItemError>,
}

pub(crate) fn check_duplicate_partitions<'a, I>(partitions: I) -> Result<()>
where
    I: IntoIterator<Item = &'a TopicPartition>,
{
    let mut seen = std::collections::HashSet::new();
    for tp in partitions {
        if !seen.insert((tp.topic.as_str(), tp.partition)) {
            return Err(Error::InvalidArgument(format!(
                "duplicate partitions not allowed: {} [{}]",
                tp.topic, tp.partition
            )));
        }
    }
    Ok(())
}
