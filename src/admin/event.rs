//! Terminal events posted to a result queue, one per admin call.

use super::acl::{AclBinding, AclResult, DeleteAclsResult};
use super::config::ConfigResource;
use super::group::{GroupResult, ListOffsetsResultInfo};
use super::options::AdminOp;
use super::result::AdminResult;
use super::scram::{UserScramCredentialAlterationResult, UserScramCredentialsDescription};
use super::topic::TopicResult;
use crate::error::Error;

/// Typed result of one admin call.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminResultKind {
    CreateTopics(AdminResult<TopicResult>),
    DeleteTopics(AdminResult<TopicResult>),
    CreatePartitions(AdminResult<TopicResult>),
    DescribeConfigs(AdminResult<ConfigResource>),
    AlterConfigs(AdminResult<ConfigResource>),
    CreateAcls(AdminResult<AclResult>),
    DescribeAcls(AdminResult<AclBinding>),
    DeleteAcls(AdminResult<DeleteAclsResult>),
    DeleteGroups(AdminResult<GroupResult>),
    DeleteConsumerGroupOffsets(AdminResult<GroupResult>),
    ListOffsets(AdminResult<ListOffsetsResultInfo>),
    DescribeUserScramCredentials(AdminResult<UserScramCredentialsDescription>),
    AlterUserScramCredentials(AdminResult<UserScramCredentialAlterationResult>),
}

macro_rules! result_kind_accessors {
    ($($variant:ident => $method:ident: $item:ty),* $(,)?) => {
        impl AdminResultKind {
            pub fn op(&self) -> AdminOp {
                match self {
                    $(AdminResultKind::$variant(_) => AdminOp::$variant,)*
                }
            }

            /// Request-level error of the wrapped result.
            pub fn error(&self) -> Option<&Error> {
                match self {
                    $(AdminResultKind::$variant(r) => r.error(),)*
                }
            }

            $(
                pub fn $method(self) -> Option<AdminResult<$item>> {
                    match self {
                        AdminResultKind::$variant(r) => Some(r),
                        _ => None,
                    }
                }
            )*
        }
    };
}

result_kind_accessors! {
    CreateTopics => into_create_topics: TopicResult,
    DeleteTopics => into_delete_topics: TopicResult,
    CreatePartitions => into_create_partitions: TopicResult,
    DescribeConfigs => into_describe_configs: ConfigResource,
    AlterConfigs => into_alter_configs: ConfigResource,
    CreateAcls => into_create_acls: AclResult,
    DescribeAcls => into_describe_acls: AclBinding,
    DeleteAcls => into_delete_acls: DeleteAclsResult,
    DeleteGroups => into_delete_groups: GroupResult,
    DeleteConsumerGroupOffsets => into_delete_consumer_group_offsets: GroupResult,
    ListOffsets => into_list_offsets: ListOffsetsResultInfo,
    DescribeUserScramCredentials => into_describe_user_scram_credentials: UserScramCredentialsDescription,
    AlterUserScramCredentials => into_alter_user_scram_credentials: UserScramCredentialAlterationResult,
}

/// The single terminal event of an admin call.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminEvent {
    pub opaque: Option<u64>,
    pub result: AdminResultKind,
}

impl AdminEvent {
    pub fn new(opaque: Option<u64>, result: AdminResultKind) -> Self {
        Self { opaque, result }
    }

    pub fn op(&self) -> AdminOp {
        self.result.op()
    }

    pub fn error(&self) -> Option<&Error> {
        self.result.error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::result::ItemError;
    use crate::error::KafkaCode;

    #[test]
    fn test_event_accessors() {
        let event = AdminEvent::new(
            Some(7),
            AdminResultKind::DeleteTopics(AdminResult::ok(vec![TopicResult {
                name: "t".to_string(),
                error: Some(ItemError::new(KafkaCode::UnknownTopicOrPartition, None)),
            }])),
        );
        assert_eq!(event.op(), AdminOp::DeleteTopics);
        assert_eq!(event.opaque, Some(7));
        assert!(event.error().is_none());

        let result = event.result.clone().into_delete_topics().unwrap();
        assert_eq!(result.len(), 1);
        assert!(event.result.into_create_topics().is_none());
    }

    #[test]
    fn test_event_request_error() {
        let event = AdminEvent::new(
            None,
            AdminResultKind::ListOffsets(AdminResult::failed(Error::Timeout { last: None })),
        );
        assert_eq!(event.error(), Some(&Error::Timeout { last: None }));
    }
}
