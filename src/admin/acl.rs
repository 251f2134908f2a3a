//! ACL bindings and filters.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::config::ResourceType;
use super::result::ItemError;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive)]
#[repr(i8)]
pub enum ResourcePatternType {
    #[default]
    Unknown = 0,
    /// Filter only: matches any pattern type.
    Any = 1,
    /// Filter only: literal, wildcard and prefix matches.
    Match = 2,
    Literal = 3,
    Prefixed = 4,
}

impl ResourcePatternType {
    pub fn from_wire(value: i8) -> Self {
        Self::from_i8(value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive)]
#[repr(i8)]
pub enum AclOperation {
    #[default]
    Unknown = 0,
    Any = 1,
    All = 2,
    Read = 3,
    Write = 4,
    Create = 5,
    Delete = 6,
    Alter = 7,
    Describe = 8,
    ClusterAction = 9,
    DescribeConfigs = 10,
    AlterConfigs = 11,
    IdempotentWrite = 12,
}

impl AclOperation {
    pub fn from_wire(value: i8) -> Self {
        Self::from_i8(value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive)]
#[repr(i8)]
pub enum AclPermissionType {
    #[default]
    Unknown = 0,
    Any = 1,
    Deny = 2,
    Allow = 3,
}

impl AclPermissionType {
    pub fn from_wire(value: i8) -> Self {
        Self::from_i8(value).unwrap_or_default()
    }
}

/// A concrete ACL: who may do what on which resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclBinding {
    pub resource_type: ResourceType,
    pub name: String,
    pub pattern_type: ResourcePatternType,
    pub principal: String,
    pub host: String,
    pub operation: AclOperation,
    pub permission_type: AclPermissionType,
}

impl AclBinding {
    pub fn new(
        resource_type: ResourceType,
        name: impl Into<String>,
        pattern_type: ResourcePatternType,
        principal: impl Into<String>,
        host: impl Into<String>,
        operation: AclOperation,
        permission_type: AclPermissionType,
    ) -> Result<Self> {
        let binding = Self {
            resource_type,
            name: name.into(),
            pattern_type,
            principal: principal.into(),
            host: host.into(),
            operation,
            permission_type,
        };
        binding.validate()?;
        Ok(binding)
    }

    fn validate(&self) -> Result<()> {
        if matches!(self.resource_type, ResourceType::Unknown | ResourceType::Any) {
            return Err(invalid("resource type", self.resource_type));
        }
        if !matches!(
            self.pattern_type,
            ResourcePatternType::Literal | ResourcePatternType::Prefixed
        ) {
            return Err(invalid("resource pattern type", self.pattern_type));
        }
        if matches!(self.operation, AclOperation::Unknown | AclOperation::Any) {
            return Err(invalid("operation", self.operation));
        }
        if matches!(
            self.permission_type,
            AclPermissionType::Unknown | AclPermissionType::Any
        ) {
            return Err(invalid("permission type", self.permission_type));
        }
        for (field, value) in [
            ("name", &self.name),
            ("principal", &self.principal),
            ("host", &self.host),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "ACL binding {} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Matches ACLs for DescribeAcls / DeleteAcls. `None` fields match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclBindingFilter {
    pub resource_type: ResourceType,
    pub name: Option<String>,
    pub pattern_type: ResourcePatternType,
    pub principal: Option<String>,
    pub host: Option<String>,
    pub operation: AclOperation,
    pub permission_type: AclPermissionType,
}

impl AclBindingFilter {
    pub fn new(
        resource_type: ResourceType,
        name: Option<String>,
        pattern_type: ResourcePatternType,
        principal: Option<String>,
        host: Option<String>,
        operation: AclOperation,
        permission_type: AclPermissionType,
    ) -> Result<Self> {
        if resource_type == ResourceType::Unknown {
            return Err(invalid("resource type", resource_type));
        }
        if pattern_type == ResourcePatternType::Unknown {
            return Err(invalid("resource pattern type", pattern_type));
        }
        if operation == AclOperation::Unknown {
            return Err(invalid("operation", operation));
        }
        if permission_type == AclPermissionType::Unknown {
            return Err(invalid("permission type", permission_type));
        }
        Ok(Self {
            resource_type,
            name,
            pattern_type,
            principal,
            host,
            operation,
            permission_type,
        })
    }

    /// Filter matching every ACL.
    pub fn any() -> Self {
        Self {
            resource_type: ResourceType::Any,
            name: None,
            pattern_type: ResourcePatternType::Any,
            principal: None,
            host: None,
            operation: AclOperation::Any,
            permission_type: AclPermissionType::Any,
        }
    }
}

fn invalid(field: &str, value: impl std::fmt::Debug) -> Error {
    Error::InvalidArgument(format!("invalid ACL {}: {:?}", field, value))
}

/// Outcome of one ACL creation, positional with the submitted bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclResult {
    pub error: Option<ItemError>,
}

/// An ACL removed by a DeleteAcls filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingAcl {
    pub error: Option<ItemError>,
    pub binding: AclBinding,
}

/// Outcome of one DeleteAcls filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAclsResult {
    pub error: Option<ItemError>,
    pub matching_acls: Vec<MatchingAcl>,
}
