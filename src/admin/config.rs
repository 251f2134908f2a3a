//! Config resources for DescribeConfigs / AlterConfigs.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::result::ItemError;
use crate::error::{Error, Result};

/// Resource type, shared by config and ACL operations.
///
/// Cluster-level ACLs use [`ResourceType::Broker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive)]
#[repr(i8)]
pub enum ResourceType {
    #[default]
    Unknown = 0,
    Any = 1,
    Topic = 2,
    Group = 3,
    Broker = 4,
}

impl ResourceType {
    pub fn from_wire(value: i8) -> Self {
        Self::from_i8(value).unwrap_or_default()
    }
}

/// Where a config value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive)]
#[repr(i8)]
pub enum ConfigSource {
    #[default]
    Unknown = 0,
    DynamicTopic = 1,
    DynamicBroker = 2,
    DynamicDefaultBroker = 3,
    StaticBroker = 4,
    Default = 5,
}

impl ConfigSource {
    pub fn from_wire(value: i8) -> Self {
        Self::from_i8(value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigEntry {
    pub name: String,
    pub value: Option<String>,
    pub source: ConfigSource,
    pub is_read_only: bool,
    pub is_default: bool,
    pub is_sensitive: bool,
    pub is_synonym: bool,
    pub synonyms: Vec<ConfigEntry>,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
            ..Default::default()
        }
    }
}

/// A config resource: the request input for both config operations, and the
/// per-resource result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigResource {
    pub resource_type: ResourceType,
    pub name: String,
    pub entries: Vec<ConfigEntry>,
    pub error: Option<ItemError>,
}

impl ConfigResource {
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Result<Self> {
        if matches!(resource_type, ResourceType::Unknown | ResourceType::Any) {
            return Err(Error::InvalidArgument(format!(
                "invalid config resource type {:?}",
                resource_type
            )));
        }
        Ok(Self {
            resource_type,
            name: name.into(),
            entries: Vec::new(),
            error: None,
        })
    }

    /// Set (or replace) a config value. For DescribeConfigs only the name is
    /// used, to restrict which entries are returned.
    pub fn set_config(&mut self, name: impl Into<String>, value: Option<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "config name must not be empty".to_string(),
            ));
        }
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(ConfigEntry::new(name, value)),
        }
        Ok(())
    }

    pub fn entry(&self, name: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Fail when the same resource is listed twice.
pub(crate) fn check_duplicate_resources(resources: &[ConfigResource]) -> Result<()> {
    for (i, r) in resources.iter().enumerate() {
        if resources[..i]
            .iter()
            .any(|o| o.resource_type == r.resource_type && o.name == r.name)
        {
            return Err(Error::InvalidArgument(format!(
                "duplicate {:?} resource in request: {}",
                r.resource_type, r.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_wire() {
        assert_eq!(ResourceType::from_wire(2), ResourceType::Topic);
        assert_eq!(ResourceType::from_wire(4), ResourceType::Broker);
        assert_eq!(ResourceType::from_wire(42), ResourceType::Unknown);
        assert_eq!(ResourceType::Group as i8, 3);
    }

    #[test]
    fn test_config_source_wire() {
        assert_eq!(ConfigSource::from_wire(1), ConfigSource::DynamicTopic);
        assert_eq!(ConfigSource::from_wire(5), ConfigSource::Default);
        assert_eq!(ConfigSource::from_wire(-3), ConfigSource::Unknown);
    }

    #[test]
    fn test_config_resource_rejects_unknown_type() {
        assert!(ConfigResource::new(ResourceType::Unknown, "x").is_err());
        assert!(ConfigResource::new(ResourceType::Any, "x").is_err());
        assert!(ConfigResource::new(ResourceType::Topic, "x").is_ok());
    }

    #[test]
    fn test_set_config_replaces_existing() {
        let mut r = ConfigResource::new(ResourceType::Topic, "t").unwrap();
        r.set_config("retention.ms", Some("1".to_string())).unwrap();
        r.set_config("retention.ms", Some("2".to_string())).unwrap();
        assert_eq!(r.entries.len(), 1);
        assert_eq!(r.entry("retention.ms").unwrap().value.as_deref(), Some("2"));
        assert!(r.set_config("", None).is_err());
    }

    #[test]
    fn test_check_duplicate_resources() {
        let a = ConfigResource::new(ResourceType::Topic, "t").unwrap();
        let b = ConfigResource::new(ResourceType::Broker, "t").unwrap();
        assert!(check_duplicate_resources(&[a.clone(), b]).is_ok());
        assert!(check_duplicate_resources(&[a.clone(), a]).is_err());
    }
}
