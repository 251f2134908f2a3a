//! Topic creation, deletion and partition growth.

use super::result::ItemError;
use crate::constants::BROKER_DEFAULT;
use crate::error::{Error, Result};

/// Largest partition count accepted by the client.
const MAX_PARTITIONS: i32 = 100_000;

/// Topic to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub name: String,
    /// Partition count, or `-1` for the broker default.
    pub num_partitions: i32,
    /// Replication factor, or `-1` for the broker default or when an explicit
    /// replica assignment is given.
    pub replication_factor: i16,
    /// Replica broker ids per partition, in partition order.
    pub replica_assignment: Vec<Vec<i32>>,
    pub configs: Vec<(String, Option<String>)>,
}

impl NewTopic {
    pub fn new(
        name: impl Into<String>,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        if num_partitions != BROKER_DEFAULT && !(1..=MAX_PARTITIONS).contains(&num_partitions) {
            return Err(Error::InvalidArgument(format!(
                "num_partitions out of expected range 1..{} or -1 for broker default",
                MAX_PARTITIONS
            )));
        }
        if replication_factor != BROKER_DEFAULT
            && !(1..=i16::MAX as i32).contains(&replication_factor)
        {
            return Err(Error::InvalidArgument(format!(
                "replication_factor out of expected range 1..{} or -1 for broker default",
                i16::MAX
            )));
        }

        Ok(Self {
            name,
            num_partitions,
            replication_factor: replication_factor as i16,
            replica_assignment: Vec::new(),
            configs: Vec::new(),
        })
    }

    /// Assign replicas for `partition`.
    ///
    /// Partitions must be assigned in order starting at 0, and only when the
    /// replication factor is left to the assignment (`-1`).
    pub fn set_replica_assignment(&mut self, partition: i32, brokers: &[i32]) -> Result<()> {
        if self.replication_factor != BROKER_DEFAULT as i16 {
            return Err(Error::InvalidArgument(
                "specifying a replication factor and a replica assignment are mutually exclusive"
                    .to_string(),
            ));
        }
        set_assignment(&mut self.replica_assignment, partition, brokers)
    }

    pub fn set_config(&mut self, name: impl Into<String>, value: Option<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "config name must not be empty".to_string(),
            ));
        }
        self.configs.push((name, value));
        Ok(())
    }
}

/// Request to grow a topic to `total_count` partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPartitions {
    pub topic: String,
    pub total_count: i32,
    /// Replica broker ids for each new partition, in order.
    pub replica_assignment: Vec<Vec<i32>>,
}

impl NewPartitions {
    pub fn new(topic: impl Into<String>, total_count: i32) -> Result<Self> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(Error::InvalidArgument(
                "topic name must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_PARTITIONS).contains(&total_count) {
            return Err(Error::InvalidArgument(format!(
                "new_total_cnt out of expected range 1..{}",
                MAX_PARTITIONS
            )));
        }
        Ok(Self {
            topic,
            total_count,
            replica_assignment: Vec::new(),
        })
    }

    /// Assign replicas for the `new_partition_idx`'th added partition.
    pub fn set_replica_assignment(&mut self, new_partition_idx: i32, brokers: &[i32]) -> Result<()> {
        set_assignment(&mut self.replica_assignment, new_partition_idx, brokers)
    }
}

fn set_assignment(assignment: &mut Vec<Vec<i32>>, partition: i32, brokers: &[i32]) -> Result<()> {
    if partition as usize != assignment.len() || partition < 0 {
        return Err(Error::InvalidArgument(format!(
            "partitions must be added in order, starting at 0: expecting partition {}, not {}",
            assignment.len(),
            partition
        )));
    }
    if brokers.is_empty() {
        return Err(Error::InvalidArgument(
            "replica assignment must list at least one broker".to_string(),
        ));
    }
    assignment.push(brokers.to_vec());
    Ok(())
}

/// Per-topic outcome of CreateTopics, DeleteTopics and CreatePartitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicResult {
    pub name: String,
    pub error: Option<ItemError>,
}

/// Fail when `names` contains the same topic twice.
pub(crate) fn check_duplicate_topics<'a>(names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::InvalidArgument(format!(
                "duplicate topic in request: {}",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_topic_validation() {
        assert!(NewTopic::new("t", 3, 1).is_ok());
        assert!(NewTopic::new("t", -1, -1).is_ok());
        assert!(NewTopic::new("", 3, 1).is_err());
        assert!(NewTopic::new("t", 0, 1).is_err());
        assert!(NewTopic::new("t", 3, 0).is_err());
        assert!(NewTopic::new("t", 3, 40_000).is_err());
    }

    #[test]
    fn test_replica_assignment_requires_default_replication_factor() {
        let mut topic = NewTopic::new("t", -1, 2).unwrap();
        assert!(topic.set_replica_assignment(0, &[1, 2]).is_err());

        let mut topic = NewTopic::new("t", -1, -1).unwrap();
        topic.set_replica_assignment(0, &[1, 2]).unwrap();
        topic.set_replica_assignment(1, &[2, 3]).unwrap();
        assert_eq!(topic.replica_assignment, vec![vec![1, 2], vec![2, 3]]);
    }

    #[test]
    fn test_replica_assignment_must_be_in_order() {
        let mut topic = NewTopic::new("t", -1, -1).unwrap();
        assert!(topic.set_replica_assignment(1, &[1]).is_err());
        assert!(topic.set_replica_assignment(0, &[]).is_err());
    }

    #[test]
    fn test_new_partitions() {
        let mut np = NewPartitions::new("t", 6).unwrap();
        np.set_replica_assignment(0, &[1]).unwrap();
        assert!(NewPartitions::new("t", 0).is_err());
        assert!(NewPartitions::new("", 3).is_err());
    }

    #[test]
    fn test_set_config() {
        let mut topic = NewTopic::new("t", 1, 1).unwrap();
        topic
            .set_config("cleanup.policy", Some("compact".to_string()))
            .unwrap();
        assert!(topic.set_config("", None).is_err());
        assert_eq!(topic.configs.len(), 1);
    }

    #[test]
    fn test_check_duplicate_topics() {
        assert!(check_duplicate_topics(["a", "b"].into_iter()).is_ok());
        assert!(check_duplicate_topics(["a", "b", "a"].into_iter()).is_err());
    }
}
