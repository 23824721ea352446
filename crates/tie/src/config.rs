//! Declarative registry configuration.
//!
//! A registry can be described in YAML (or JSON) and built into a
//! [`PriorityTagManager`]:
//!
//! ```yaml
//! tags:
//!   - pattern: '%(\w+)%'
//!     priority: 5
//!     flags: [case_insensitive]
//!     group: 1
//!     cached: true
//!   - pattern: '\{\{ (?P<name>\S+) \}\}'
//!     group: name
//! ```
//!
//! Every entry gets the default substitution processor. Custom processors
//! are attached in code.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TieError};
use crate::pattern::Flags;
use crate::processor::Sub;
use crate::registry::{PriorityTagManager, TagRegistry};
use crate::tag::{GroupKey, Tag};

/// Top-level registry description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub tags: Vec<TagConfig>,
}

/// One tag entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagConfig {
    pub pattern: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub flags: Vec<FlagName>,
    /// Group used as the lookup key; the first group when absent.
    #[serde(default)]
    pub group: Option<GroupConfig>,
    #[serde(default)]
    pub cached: bool,
}

/// Flag names as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagName {
    CaseInsensitive,
    MultiLine,
    DotMatchesNewLine,
    Verbose,
    Ascii,
}

impl From<FlagName> for Flags {
    fn from(name: FlagName) -> Self {
        match name {
            FlagName::CaseInsensitive => Flags::CASE_INSENSITIVE,
            FlagName::MultiLine => Flags::MULTI_LINE,
            FlagName::DotMatchesNewLine => Flags::DOT_MATCHES_NEW_LINE,
            FlagName::Verbose => Flags::VERBOSE,
            FlagName::Ascii => Flags::ASCII,
        }
    }
}

/// A group given by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupConfig {
    Index(usize),
    Name(String),
}

impl From<GroupConfig> for GroupKey {
    fn from(group: GroupConfig) -> Self {
        match group {
            GroupConfig::Index(index) => GroupKey::Index(index),
            GroupConfig::Name(name) => GroupKey::Name(name),
        }
    }
}

impl TagConfig {
    /// Combined compilation flags.
    pub fn flags(&self) -> Flags {
        self.flags
            .iter()
            .fold(Flags::empty(), |acc, name| acc | Flags::from(*name))
    }

    /// Compiles this entry into a tag.
    pub fn build(&self) -> Result<Tag> {
        let mut tag = Tag::with_flags(&self.pattern, self.flags())?;
        if let Some(group) = &self.group {
            tag = tag.with_processor(Sub::with_group(GroupKey::from(group.clone())));
        }
        if self.cached {
            tag = tag.cached();
        }
        Ok(tag)
    }
}

impl RegistryConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration file. `.json` files are parsed as JSON,
    /// anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TieError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Builds a priority registry from the configured tags.
    pub fn build(&self) -> Result<PriorityTagManager> {
        let mut registry = PriorityTagManager::new();
        for entry in &self.tags {
            registry.add_with_priority(entry.build()?, entry.priority)?;
        }
        debug!(tags = registry.len(), "registry built from configuration");
        Ok(registry)
    }
}
