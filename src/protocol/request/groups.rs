//! DeleteGroups and OffsetDelete requests.

use nom::IResult;
use nombytes::NomBytes;

use crate::admin::TopicPartition;
use crate::encode::RequestBuffer;
use crate::error::Result;
use crate::protocol::response::{
    DeleteGroupsResponseData, OffsetDeleteResponseData, parse_delete_groups_response,
    parse_offset_delete_response,
};
use crate::protocol::{ApiKey, ProtocolRequest};

#[derive(Debug, Clone)]
pub struct DeleteGroupsRequest {
    pub groups: Vec<String>,
}

impl ProtocolRequest for DeleteGroupsRequest {
    type Response = DeleteGroupsResponseData;

    const API_KEY: ApiKey = ApiKey::DeleteGroups;

    fn encode_body(&self, buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        buf.write_array(&self.groups, |buf, group| buf.write_string(group))
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_delete_groups_response(s, version)
    }
}

#[derive(Debug, Clone)]
pub struct OffsetDeleteRequest {
    pub group: String,
    pub partitions: Vec<TopicPartition>,
}

/// Group partitions by topic, keeping the order topics first appear in.
pub(crate) fn group_by_topic<T, F>(items: &[T], topic_of: F) -> Vec<(&str, Vec<&T>)>
where
    F: Fn(&T) -> &str,
{
    let mut topics: Vec<(&str, Vec<&T>)> = Vec::new();
    for item in items {
        let topic = topic_of(item);
        match topics.iter_mut().find(|(name, _)| *name == topic) {
            Some((_, members)) => members.push(item),
            None => topics.push((topic, vec![item])),
        }
    }
    topics
}

impl ProtocolRequest for OffsetDeleteRequest {
    type Response = OffsetDeleteResponseData;

    const API_KEY: ApiKey = ApiKey::OffsetDelete;

    fn encode_body(&self, buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        buf.write_string(&self.group)?;
        let topics = group_by_topic(&self.partitions, |tp| tp.topic.as_str());
        buf.write_array(&topics, |buf, (topic, partitions)| {
            buf.write_string(topic)?;
            buf.write_array(partitions.as_slice(), |buf, tp| {
                buf.write_i32(tp.partition);
                Ok(())
            })
        })
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_offset_delete_response(s, version)
    }
}
