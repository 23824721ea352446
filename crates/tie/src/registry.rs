//! Tag registries: ordered collections of tags.
//!
//! Two implementations of [`TagRegistry`] are provided:
//!
//! - [`TagManager`] yields tags in insertion order.
//! - [`PriorityTagManager`] yields tags grouped by ascending priority, keeping
//!   insertion order inside each priority.
//!
//! Anything implementing [`TagRegistry`] can stand in for either of them,
//! including as the process-wide default used by [`register`] and
//! [`DefaultRenderer`](crate::DefaultRenderer).
//!
//! # Process-wide default
//!
//! ```rust
//! use tie::{register, reset_registry, default_tags};
//!
//! register(["%dummy%", "--dumdum--"]).unwrap();
//! assert_eq!(default_tags().len(), 2);
//! reset_registry();
//! ```
//!
//! Mutation of the default registry is serialized by an internal lock.
//! Renders take a read lock only long enough to snapshot the tag list.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::context::value_kind;
use crate::error::{Result, TieError};
use crate::tag::Tag;

/// Anything a registry accepts for registration.
#[derive(Debug)]
pub enum TagSpec {
    /// A ready tag, possibly shared with other registries.
    Tag(Arc<Tag>),
    /// A pattern string, compiled with the default processor.
    Pattern(String),
    /// A compiled regex, wrapped with the default processor.
    Regex(Regex),
    /// A spec with an explicit priority, for [`PriorityTagManager`].
    Prioritized(Box<TagSpec>, i32),
}

impl TagSpec {
    /// Attaches a priority to this spec.
    pub fn with_priority(self, priority: i32) -> Self {
        TagSpec::Prioritized(Box::new(self), priority)
    }

    /// Turns a priority-less spec into a tag.
    ///
    /// Fails with [`TieError::InvalidTag`] for a prioritized spec and with
    /// [`TieError::InvalidPattern`] for a pattern that does not compile.
    pub fn into_tag(self) -> Result<Arc<Tag>> {
        match self {
            TagSpec::Tag(tag) => Ok(tag),
            TagSpec::Pattern(pattern) => Ok(Arc::new(Tag::new(&pattern)?)),
            TagSpec::Regex(regex) => Ok(Arc::new(Tag::from_regex(regex))),
            TagSpec::Prioritized(inner, priority) => Err(TieError::InvalidTag(format!(
                "({}, {}) is a priority pair; only a priority registry accepts it",
                inner, priority
            ))),
        }
    }

    /// Splits off the priority, defaulting to 0.
    fn into_prioritized(self) -> Result<(TagSpec, i32)> {
        match self {
            TagSpec::Prioritized(inner, priority) => match *inner {
                nested @ TagSpec::Prioritized(..) => Err(TieError::InvalidTag(format!(
                    "nested priority pair {}",
                    nested
                ))),
                inner => Ok((inner, priority)),
            },
            other => Ok((other, 0)),
        }
    }
}

impl fmt::Display for TagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSpec::Tag(tag) => write!(f, "{}", tag),
            TagSpec::Pattern(pattern) => write!(f, "{:?}", pattern),
            TagSpec::Regex(regex) => write!(f, "/{}/", regex.as_str()),
            TagSpec::Prioritized(inner, priority) => write!(f, "({}, {})", inner, priority),
        }
    }
}

impl From<Tag> for TagSpec {
    fn from(tag: Tag) -> Self {
        TagSpec::Tag(Arc::new(tag))
    }
}

impl From<Arc<Tag>> for TagSpec {
    fn from(tag: Arc<Tag>) -> Self {
        TagSpec::Tag(tag)
    }
}

impl From<&Arc<Tag>> for TagSpec {
    fn from(tag: &Arc<Tag>) -> Self {
        TagSpec::Tag(Arc::clone(tag))
    }
}

impl From<&str> for TagSpec {
    fn from(pattern: &str) -> Self {
        TagSpec::Pattern(pattern.to_string())
    }
}

impl From<String> for TagSpec {
    fn from(pattern: String) -> Self {
        TagSpec::Pattern(pattern)
    }
}

impl From<Regex> for TagSpec {
    fn from(regex: Regex) -> Self {
        TagSpec::Regex(regex)
    }
}

impl<T: Into<TagSpec>> From<(T, i32)> for TagSpec {
    fn from((spec, priority): (T, i32)) -> Self {
        spec.into().with_priority(priority)
    }
}

/// Loosely typed registration input: a string is a pattern and a
/// `[pattern, priority]` array is a priority pair. Anything else is invalid.
impl TryFrom<&Value> for TagSpec {
    type Error = TieError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(pattern) => Ok(TagSpec::Pattern(pattern.clone())),
            Value::Array(pair) if pair.len() == 2 => {
                let priority = pair[1]
                    .as_i64()
                    .and_then(|p| i32::try_from(p).ok())
                    .ok_or_else(|| invalid_value(value))?;
                match &pair[0] {
                    Value::String(pattern) => {
                        Ok(TagSpec::Pattern(pattern.clone()).with_priority(priority))
                    }
                    _ => Err(invalid_value(value)),
                }
            }
            _ => Err(invalid_value(value)),
        }
    }
}

fn invalid_value(value: &Value) -> TieError {
    TieError::InvalidTag(format!(
        "Invalid tag {} of type {}",
        value,
        value_kind(value)
    ))
}

/// An ordered, repeatable sequence of tags.
pub trait TagRegistry: Send + Sync {
    /// Registers a tag or tag spec.
    fn add(&mut self, spec: TagSpec) -> Result<()>;

    /// Removes every registered tag.
    fn clear(&mut self);

    /// Yields the registered tags in application order.
    fn iter(&self) -> Box<dyn Iterator<Item = &Arc<Tag>> + '_>;

    fn len(&self) -> usize {
        self.iter().count()
    }

    fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Snapshot of the ordered tags.
    fn tags(&self) -> Vec<Arc<Tag>> {
        self.iter().cloned().collect()
    }

    /// Clears the memoization cache of every registered tag.
    fn clear_cache(&self) {
        for tag in self.iter() {
            tag.clear_cache();
        }
    }

    /// Registers several specs, stopping at the first failure.
    fn extend<I>(&mut self, specs: I) -> Result<()>
    where
        Self: Sized,
        I: IntoIterator,
        I::Item: Into<TagSpec>,
    {
        for spec in specs {
            self.add(spec.into())?;
        }
        Ok(())
    }
}

/// Registry yielding tags in insertion order.
#[derive(Debug, Default)]
pub struct TagManager {
    tags: Vec<Arc<Tag>>,
}

impl TagManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TagRegistry for TagManager {
    fn add(&mut self, spec: TagSpec) -> Result<()> {
        let tag = spec.into_tag()?;
        debug!(tag = %tag, "added tag to TagManager");
        self.tags.push(tag);
        Ok(())
    }

    fn clear(&mut self) {
        self.tags.clear();
        debug!("TagManager has been cleared");
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Arc<Tag>> + '_> {
        Box::new(self.tags.iter())
    }

    fn len(&self) -> usize {
        self.tags.len()
    }
}

/// Registry yielding tags by ascending priority.
///
/// Tags registered without a priority get priority 0. Tags sharing a
/// priority keep their relative insertion order, so registering
/// `(A, 5), (B, 1), (C, 5)` yields `B, A, C`.
#[derive(Debug, Default)]
pub struct PriorityTagManager {
    buckets: BTreeMap<i32, Vec<Arc<Tag>>>,
}

impl PriorityTagManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `spec` under `priority`.
    pub fn add_with_priority(&mut self, spec: impl Into<TagSpec>, priority: i32) -> Result<()> {
        self.add(spec.into().with_priority(priority))
    }

    /// Tags registered under exactly `priority`, in insertion order.
    pub fn bucket(&self, priority: i32) -> &[Arc<Tag>] {
        self.buckets
            .get(&priority)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct priorities in ascending order.
    pub fn priorities(&self) -> impl Iterator<Item = i32> + '_ {
        self.buckets.keys().copied()
    }
}

impl TagRegistry for PriorityTagManager {
    fn add(&mut self, spec: TagSpec) -> Result<()> {
        let (spec, priority) = spec.into_prioritized()?;
        let tag = spec.into_tag()?;
        debug!(tag = %tag, priority, "added tag to PriorityTagManager");
        self.buckets.entry(priority).or_default().push(tag);
        Ok(())
    }

    fn clear(&mut self) {
        self.buckets.clear();
        debug!("PriorityTagManager has been cleared");
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Arc<Tag>> + '_> {
        Box::new(self.buckets.values().flatten())
    }

    fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

// ============================================================================
// Process-wide default registry
// ============================================================================

static DEFAULT_REGISTRY: Lazy<RwLock<Box<dyn TagRegistry>>> =
    Lazy::new(|| RwLock::new(Box::new(TagManager::new())));

/// Registers specs with the default registry.
///
/// Specs are added in order. Registration stops at the first invalid spec;
/// the ones before it stay registered.
pub fn register<I>(specs: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Into<TagSpec>,
{
    let mut registry = DEFAULT_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    for spec in specs {
        let spec = spec.into();
        let label = spec.to_string();
        registry.add(spec)?;
        info!(spec = %label, "registered tag");
    }
    Ok(())
}

/// Replaces the default registry, returning the previous one.
pub fn set_registry(registry: Box<dyn TagRegistry>) -> Box<dyn TagRegistry> {
    let mut guard = DEFAULT_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    info!("new default tag registry installed");
    std::mem::replace(&mut *guard, registry)
}

/// Restores an empty insertion-order registry as the default.
pub fn reset_registry() -> Box<dyn TagRegistry> {
    set_registry(Box::new(TagManager::new()))
}

/// Runs `f` with shared access to the default registry.
pub fn with_registry<R>(f: impl FnOnce(&dyn TagRegistry) -> R) -> R {
    let guard = DEFAULT_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    f(guard.as_ref())
}

/// Runs `f` with exclusive access to the default registry.
pub fn with_registry_mut<R>(f: impl FnOnce(&mut dyn TagRegistry) -> R) -> R {
    let mut guard = DEFAULT_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    f(guard.as_mut())
}

/// Snapshot of the default registry's ordered tags.
pub fn default_tags() -> Vec<Arc<Tag>> {
    with_registry(|registry| registry.tags())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use serde_json::json;
    use serial_test::serial;

    fn patterns(registry: &dyn TagRegistry) -> Vec<String> {
        registry
            .iter()
            .map(|t| t.pattern().as_str().to_string())
            .collect()
    }

    #[test]
    fn test_insertion_order() {
        let mut manager = TagManager::new();
        manager.extend(["dummy", "dumdum", "mudmud"]).unwrap();
        assert_eq!(patterns(&manager), vec!["dummy", "dumdum", "mudmud"]);
        // Repeatable
        assert_eq!(patterns(&manager), vec!["dummy", "dumdum", "mudmud"]);
        assert_eq!(manager.len(), 3);
    }

    #[test]
    fn test_iteration_yields_registered_instances() {
        let tags: Vec<Arc<Tag>> = ["dummy", "dumdum", "mudmud"]
            .iter()
            .map(|p| Arc::new(Tag::new(p).unwrap()))
            .collect();
        let mut manager = TagManager::new();
        manager.extend(&tags).unwrap();
        for (registered, original) in manager.iter().zip(&tags) {
            assert!(Arc::ptr_eq(registered, original));
        }
    }

    #[test]
    fn test_clear() {
        let mut manager = TagManager::new();
        manager.extend(["dummy"]).unwrap();
        manager.clear();
        assert!(manager.is_empty());
        assert_eq!(manager.iter().count(), 0);
    }

    #[test]
    fn test_register_regex_and_tag() {
        let mut manager = TagManager::new();
        manager.add(Regex::new(r"%\w+%").unwrap().into()).unwrap();
        manager.add(Tag::new("x").unwrap().cached().into()).unwrap();
        assert_eq!(patterns(&manager), vec![r"%\w+%", "x"]);
        assert!(manager.tags()[1].is_cached());
    }

    #[test]
    fn test_invalid_pattern_on_add() {
        let mut manager = TagManager::new();
        assert!(matches!(
            manager.add("(unclosed".into()),
            Err(TieError::InvalidPattern { .. })
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_insertion_manager_rejects_priority_pairs() {
        let mut manager = TagManager::new();
        assert!(matches!(
            manager.add(("dummy", 3).into()),
            Err(TieError::InvalidTag(_))
        ));
    }

    #[test]
    fn test_value_specs() {
        let spec = TagSpec::try_from(&json!("dummy")).unwrap();
        assert!(matches!(spec, TagSpec::Pattern(ref p) if p == "dummy"));

        let spec = TagSpec::try_from(&json!(["dummy", 4])).unwrap();
        assert!(matches!(spec, TagSpec::Prioritized(_, 4)));

        for bad in [json!(666), json!(null), json!({"a": 1}), json!(["a", "b"]), json!([1, 2])] {
            assert!(
                matches!(TagSpec::try_from(&bad), Err(TieError::InvalidTag(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_tag_message() {
        let err = TagSpec::try_from(&json!(666)).unwrap_err();
        assert_eq!(err.to_string(), "invalid tag: Invalid tag 666 of type number");
    }

    #[test]
    fn test_priority_order() {
        let mut manager = PriorityTagManager::new();
        manager
            .extend([("dummy", 4), ("dumdum", 7), ("mudmud", 0)])
            .unwrap();
        assert_eq!(patterns(&manager), vec!["mudmud", "dummy", "dumdum"]);
    }

    #[test]
    fn test_priority_ties_keep_insertion_order() {
        let mut manager = PriorityTagManager::new();
        manager.extend([("A", 5), ("B", 1), ("C", 5)]).unwrap();
        assert_eq!(patterns(&manager), vec!["B", "A", "C"]);
        assert_eq!(manager.priorities().collect::<Vec<_>>(), vec![1, 5]);
    }

    #[test]
    fn test_priority_defaults_to_zero() {
        let tags: Vec<Arc<Tag>> = ["dummy", "dumdum", "mudmud"]
            .iter()
            .map(|p| Arc::new(Tag::new(p).unwrap()))
            .collect();
        let mut manager = PriorityTagManager::new();
        manager.extend(&tags).unwrap();
        assert_eq!(manager.bucket(0).len(), 3);
        for (stored, original) in manager.bucket(0).iter().zip(&tags) {
            assert!(Arc::ptr_eq(stored, original));
        }
    }

    #[test]
    fn test_negative_priorities_come_first() {
        let mut manager = PriorityTagManager::new();
        manager.add_with_priority("late", 0).unwrap();
        manager.add_with_priority("early", -3).unwrap();
        assert_eq!(patterns(&manager), vec!["early", "late"]);
    }

    #[test]
    fn test_nested_priority_rejected() {
        let mut manager = PriorityTagManager::new();
        let nested = TagSpec::from("dummy").with_priority(1).with_priority(2);
        assert!(matches!(manager.add(nested), Err(TieError::InvalidTag(_))));
    }

    #[test]
    fn test_registry_clear_cache() {
        let mut manager = TagManager::new();
        manager
            .extend([
                Tag::new("dummy").unwrap().cached(),
                Tag::new("dumdum").unwrap().cached(),
                Tag::new("mudmud").unwrap().cached(),
            ])
            .unwrap();
        let ctx = Context::new()
            .with("dummy", "dummy")
            .with("dumdum", "dumdum")
            .with("mudmud", "mudmud");
        for tag in manager.iter() {
            tag.process("dummydumdummudmud", &ctx).unwrap();
            assert_eq!(tag.cache_len(), 1);
        }
        manager.clear_cache();
        assert!(manager.iter().all(|t| t.cache_len() == 0));
    }

    #[test]
    #[serial]
    fn test_default_registry_register() {
        reset_registry();
        register(["dummy", "dumdum", "mudmud"]).unwrap();
        let tags = default_tags();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].pattern().as_str(), "dummy");
        reset_registry();
    }

    #[test]
    #[serial]
    fn test_default_registry_invalid_tag() {
        reset_registry();
        // The insertion-order default refuses priority pairs.
        let result = register([("x", 1)]);
        assert!(matches!(result, Err(TieError::InvalidTag(_))));
        assert!(default_tags().is_empty());
    }

    #[test]
    #[serial]
    fn test_set_registry_returns_previous() {
        reset_registry();
        register(["dummy"]).unwrap();
        let previous = set_registry(Box::new(PriorityTagManager::new()));
        assert_eq!(previous.len(), 1);

        register([("b", 2), ("a", 1)]).unwrap();
        assert_eq!(with_registry(|r| patterns(r)), vec!["a", "b"]);

        with_registry_mut(|r| r.clear());
        assert!(default_tags().is_empty());
        reset_registry();
    }

    #[test]
    #[serial]
    fn test_custom_registry() {
        #[derive(Default)]
        struct Reversed(Vec<Arc<Tag>>);

        impl TagRegistry for Reversed {
            fn add(&mut self, spec: TagSpec) -> Result<()> {
                self.0.insert(0, spec.into_tag()?);
                Ok(())
            }
            fn clear(&mut self) {
                self.0.clear();
            }
            fn iter(&self) -> Box<dyn Iterator<Item = &Arc<Tag>> + '_> {
                Box::new(self.0.iter())
            }
        }

        set_registry(Box::new(Reversed::default()));
        register(["first", "second"]).unwrap();
        assert_eq!(with_registry(|r| patterns(r)), vec!["second", "first"]);
        reset_registry();
    }
}
