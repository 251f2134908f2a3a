//! CreateTopics, DeleteTopics and CreatePartitions response parsing.

use nom::{IResult, number::complete::be_i32};
use nombytes::NomBytes;

use super::{error_of, parse_error_code};
use crate::admin::TopicResult;
use crate::error::KafkaCode;
use crate::parser::{parse_array, parse_nullable_string, parse_string};
use crate::protocol::ProtocolResponse;

/// Per-topic outcome shared by the three topic APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicErrorData {
    pub name: String,
    pub error_code: KafkaCode,
    pub error_message: Option<String>,
}

impl From<TopicErrorData> for TopicResult {
    fn from(t: TopicErrorData) -> Self {
        TopicResult {
            error: error_of(t.error_code, t.error_message),
            name: t.name,
        }
    }
}

fn parse_topic_error(s: NomBytes, with_message: bool) -> IResult<NomBytes, TopicErrorData> {
    let (s, name) = parse_string(s)?;
    let (s, error_code) = parse_error_code(s)?;
    let (s, error_message) = if with_message {
        parse_nullable_string(s)?
    } else {
        (s, None)
    };
    Ok((
        s,
        TopicErrorData {
            name,
            error_code,
            error_message,
        },
    ))
}

macro_rules! topic_response {
    ($name:ident) => {
        impl $name {
            pub fn into_topic_results(self) -> Vec<TopicResult> {
                self.topics.into_iter().map(TopicResult::from).collect()
            }
        }

        impl ProtocolResponse for $name {
            fn throttle_time_ms(&self) -> i32 {
                self.throttle_time_ms
            }

            fn item_codes(&self) -> Vec<KafkaCode> {
                self.topics.iter().map(|t| t.error_code).collect()
            }
        }
    };
}

// ============================================================================
// CreateTopics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTopicsResponseData {
    pub throttle_time_ms: i32,
    pub topics: Vec<TopicErrorData>,
}

topic_response!(CreateTopicsResponseData);

pub fn parse_create_topics_response(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, CreateTopicsResponseData> {
    let (s, throttle_time_ms) = if version >= 2 { be_i32(s)? } else { (s, 0) };
    let with_message = version >= 1;
    let (s, topics) = parse_array(|s: NomBytes| parse_topic_error(s, with_message))(s)?;
    Ok((
        s,
        CreateTopicsResponseData {
            throttle_time_ms,
            topics,
        },
    ))
}

// ============================================================================
// DeleteTopics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteTopicsResponseData {
    pub throttle_time_ms: i32,
    pub topics: Vec<TopicErrorData>,
}

topic_response!(DeleteTopicsResponseData);

pub fn parse_delete_topics_response(
    s: NomBytes,
    version: i16,
) -> IResult<NomBytes, DeleteTopicsResponseData> {
    let (s, throttle_time_ms) = if version >= 1 { be_i32(s)? } else { (s, 0) };
    let (s, topics) = parse_array(|s: NomBytes| parse_topic_error(s, false))(s)?;
    Ok((
        s,
        DeleteTopicsResponseData {
            throttle_time_ms,
            topics,
        },
    ))
}

// ============================================================================
// CreatePartitions
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatePartitionsResponseData {
    pub throttle_time_ms: i32,
    pub topics: Vec<TopicErrorData>,
}

topic_response!(CreatePartitionsResponseData);

pub fn parse_create_partitions_response(
    s: NomBytes,
    _version: i16,
) -> IResult<NomBytes, CreatePartitionsResponseData> {
    let (s, throttle_time_ms) = be_i32(s)?;
    let (s, topics) = parse_array(|s: NomBytes| parse_topic_error(s, true))(s)?;
    Ok((
        s,
        CreatePartitionsResponseData {
            throttle_time_ms,
            topics,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::RequestBuffer;
    use crate::error::Error;
    use crate::parser::decode;

    fn topics_body(throttle: Option<i32>, topics: &[(&str, i16, Option<Option<&str>>)]) -> bytes::Bytes {
        let mut b = RequestBuffer::new();
        if let Some(t) = throttle {
            b.write_i32(t);
        }
        b.write_i32(topics.len() as i32);
        for (name, code, msg) in topics {
            b.write_string(name).unwrap();
            b.write_i16(*code);
            if let Some(msg) = msg {
                b.write_nullable_string(*msg).unwrap();
            }
        }
        b.freeze()
    }

    #[test]
    fn test_create_topics_v0() {
        let data = topics_body(None, &[("a", 0, None), ("b", 36, None)]);
        let r = decode(data, |s| parse_create_topics_response(s, 0)).unwrap();
        assert_eq!(r.throttle_time_ms, 0);
        assert_eq!(r.item_codes(), vec![KafkaCode::None, KafkaCode::TopicAlreadyExists]);

        let results = r.into_topic_results();
        assert!(results[0].error.is_none());
        let err = results[1].error.as_ref().unwrap();
        assert_eq!(err.code, KafkaCode::TopicAlreadyExists);
        assert_eq!(err.message, KafkaCode::TopicAlreadyExists.description());
    }

    #[test]
    fn test_create_topics_v2_throttle_and_message() {
        let data = topics_body(
            Some(100),
            &[("a", 37, Some(Some("bad partitions"))), ("b", 0, Some(None))],
        );
        let r = decode(data, |s| parse_create_topics_response(s, 2)).unwrap();
        assert_eq!(r.throttle_time_ms(), 100);
        assert_eq!(r.topics[0].error_message.as_deref(), Some("bad partitions"));
        assert_eq!(r.topics[1].error_code, KafkaCode::None);
    }

    #[test]
    fn test_delete_topics_v1() {
        let data = topics_body(Some(0), &[("gone", 3, None)]);
        let r = decode(data, |s| parse_delete_topics_response(s, 1)).unwrap();
        assert_eq!(r.topics.len(), 1);
        assert_eq!(r.topics[0].error_code, KafkaCode::UnknownTopicOrPartition);
    }

    #[test]
    fn test_create_partitions() {
        let data = topics_body(Some(5), &[("t", 0, Some(None))]);
        let r = decode(data, |s| parse_create_partitions_response(s, 1)).unwrap();
        assert_eq!(r.throttle_time_ms, 5);
        assert!(r.into_topic_results()[0].error.is_none());
    }

    #[test]
    fn test_truncated_topic_list() {
        let mut b = RequestBuffer::new();
        b.write_i32(2);
        b.write_string("a").unwrap();
        b.write_i16(0);
        let err = decode(b.freeze(), |s| parse_delete_topics_response(s, 0)).unwrap_err();
        assert_eq!(err, Error::TruncatedBuffer);
    }

    #[test]
    fn test_unknown_error_code_maps_to_unknown() {
        let data = topics_body(None, &[("a", 30000, None)]);
        let r = decode(data, |s| parse_delete_topics_response(s, 0)).unwrap();
        assert_eq!(r.topics[0].error_code, KafkaCode::Unknown);
    }
}
