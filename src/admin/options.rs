//! Per-call admin options.

use std::fmt;
use std::time::Duration;

use super::group::IsolationLevel;
use crate::error::{Error, Result};
use crate::protocol::ApiKey;
use crate::types::BrokerId;

/// Admin operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminOp {
    CreateTopics,
    DeleteTopics,
    CreatePartitions,
    DescribeConfigs,
    AlterConfigs,
    CreateAcls,
    DescribeAcls,
    DeleteAcls,
    DeleteGroups,
    DeleteConsumerGroupOffsets,
    ListOffsets,
    DescribeUserScramCredentials,
    AlterUserScramCredentials,
}

impl AdminOp {
    /// The protocol API carrying this operation.
    pub fn api_key(self) -> ApiKey {
        match self {
            AdminOp::CreateTopics => ApiKey::CreateTopics,
            AdminOp::DeleteTopics => ApiKey::DeleteTopics,
            AdminOp::CreatePartitions => ApiKey::CreatePartitions,
            AdminOp::DescribeConfigs => ApiKey::DescribeConfigs,
            AdminOp::AlterConfigs => ApiKey::AlterConfigs,
            AdminOp::CreateAcls => ApiKey::CreateAcls,
            AdminOp::DescribeAcls => ApiKey::DescribeAcls,
            AdminOp::DeleteAcls => ApiKey::DeleteAcls,
            AdminOp::DeleteGroups => ApiKey::DeleteGroups,
            AdminOp::DeleteConsumerGroupOffsets => ApiKey::OffsetDelete,
            AdminOp::ListOffsets => ApiKey::ListOffsets,
            AdminOp::DescribeUserScramCredentials => ApiKey::DescribeUserScramCredentials,
            AdminOp::AlterUserScramCredentials => ApiKey::AlterUserScramCredentials,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminOp::CreateTopics => "CreateTopics",
            AdminOp::DeleteTopics => "DeleteTopics",
            AdminOp::CreatePartitions => "CreatePartitions",
            AdminOp::DescribeConfigs => "DescribeConfigs",
            AdminOp::AlterConfigs => "AlterConfigs",
            AdminOp::CreateAcls => "CreateAcls",
            AdminOp::DescribeAcls => "DescribeAcls",
            AdminOp::DeleteAcls => "DeleteAcls",
            AdminOp::DeleteGroups => "DeleteGroups",
            AdminOp::DeleteConsumerGroupOffsets => "DeleteConsumerGroupOffsets",
            AdminOp::ListOffsets => "ListOffsets",
            AdminOp::DescribeUserScramCredentials => "DescribeUserScramCredentials",
            AdminOp::AlterUserScramCredentials => "AlterUserScramCredentials",
        }
    }
}

impl fmt::Display for AdminOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one admin call.
///
/// Options created with [`AdminOptions::for_op`] only accept settings that
/// operation understands and may only be used with it; [`AdminOptions::new`]
/// accepts everything and lets each operation pick what applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminOptions {
    for_op: Option<AdminOp>,
    request_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    validate_only: bool,
    broker: Option<BrokerId>,
    isolation_level: IsolationLevel,
    opaque: Option<u64>,
}

impl AdminOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_op(op: AdminOp) -> Self {
        Self {
            for_op: Some(op),
            ..Default::default()
        }
    }

    fn check(&self, setting: &str, allowed: &[AdminOp]) -> Result<()> {
        match self.for_op {
            Some(op) if !allowed.contains(&op) => Err(Error::InvalidArgument(format!(
                "{} is not supported for {}",
                setting, op
            ))),
            _ => Ok(()),
        }
    }

    /// Overall deadline for the call, including retries.
    pub fn set_request_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return Err(Error::InvalidArgument(
                "request timeout must be positive".to_string(),
            ));
        }
        self.request_timeout = Some(timeout);
        Ok(())
    }

    /// How long the broker waits for the operation to propagate.
    pub fn set_operation_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.check(
            "operation_timeout",
            &[
                AdminOp::CreateTopics,
                AdminOp::DeleteTopics,
                AdminOp::CreatePartitions,
            ],
        )?;
        if timeout.as_millis() > i32::MAX as u128 {
            return Err(Error::InvalidArgument(
                "operation timeout is too large".to_string(),
            ));
        }
        self.operation_timeout = Some(timeout);
        Ok(())
    }

    /// Ask the broker to validate the request without applying it.
    pub fn set_validate_only(&mut self, validate_only: bool) -> Result<()> {
        self.check(
            "validate_only",
            &[
                AdminOp::CreateTopics,
                AdminOp::CreatePartitions,
                AdminOp::AlterConfigs,
            ],
        )?;
        self.validate_only = validate_only;
        Ok(())
    }

    /// Send the request to this broker instead of the one the operation
    /// would normally pick.
    pub fn set_broker(&mut self, broker: BrokerId) -> Result<()> {
        if !broker.is_valid() {
            return Err(Error::InvalidArgument(format!("invalid broker id {}", broker)));
        }
        self.broker = Some(broker);
        Ok(())
    }

    pub fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<()> {
        self.check("isolation_level", &[AdminOp::ListOffsets])?;
        self.isolation_level = level;
        Ok(())
    }

    /// Value handed back untouched on the result event.
    pub fn set_opaque(&mut self, opaque: u64) {
        self.opaque = Some(opaque);
    }

    /// Fail if these options were created for a different operation.
    pub fn validate_for(&self, op: AdminOp) -> Result<()> {
        match self.for_op {
            Some(for_op) if for_op != op => Err(Error::InvalidArgument(format!(
                "options created for {} used with {}",
                for_op, op
            ))),
            _ => Ok(()),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }

    /// Operation timeout in ms as sent on the wire.
    pub fn operation_timeout_ms(&self, default_ms: i32) -> i32 {
        self.operation_timeout
            .map(|t| t.as_millis() as i32)
            .unwrap_or(default_ms)
    }

    pub fn validate_only(&self) -> bool {
        self.validate_only
    }

    pub fn broker(&self) -> Option<BrokerId> {
        self.broker
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn opaque(&self) -> Option<u64> {
        self.opaque
    }
}
