//! Tags: a compiled pattern paired with a processor.
//!
//! A [`Tag`] recognizes placeholders in a template and replaces them with the
//! value its [`Processor`] computes from the render context.
//!
//! # Example
//!
//! ```rust
//! use tie::{Context, Tag};
//!
//! let tag = Tag::new(r"%(\w+)%").unwrap();
//! let ctx = Context::new().with("name", "raphi");
//!
//! let out = tag.process("i am %name%", &ctx).unwrap();
//! assert_eq!(out, "i am raphi");
//! ```
//!
//! # Literal replacement
//!
//! Matches are always found against the original text. Each distinct matched
//! text is evaluated once and every occurrence of that exact text in the
//! working output is replaced. A replacement value that equals another tag's
//! source text can therefore be picked up by a later tag, so rendering is not
//! idempotent. Empty matches are skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use regex::{Captures, Regex};
use tracing::debug;

use crate::context::{Context, ContextWarning, Rendered};
use crate::error::{Result, TieError};
use crate::pattern::{Flags, Pattern};
use crate::processor::{Processor, Sub};

/// Identifies a capture group by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Index(usize),
    Name(String),
}

impl Default for GroupKey {
    fn default() -> Self {
        GroupKey::Index(1)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Index(i) => write!(f, "{}", i),
            GroupKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for GroupKey {
    fn from(index: usize) -> Self {
        GroupKey::Index(index)
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        GroupKey::Name(name.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(name: String) -> Self {
        GroupKey::Name(name)
    }
}

/// One occurrence of a tag's pattern in a scanned string.
pub struct TagMatch<'t> {
    caps: Captures<'t>,
    regex: &'t Regex,
}

impl<'t> TagMatch<'t> {
    /// The full matched text.
    pub fn as_str(&self) -> &'t str {
        self.caps.get(0).map_or("", |m| m.as_str())
    }

    /// Byte offset of the match start in the scanned text.
    pub fn start(&self) -> usize {
        self.caps.get(0).map_or(0, |m| m.start())
    }

    /// Byte offset just past the match end.
    pub fn end(&self) -> usize {
        self.caps.get(0).map_or(0, |m| m.end())
    }

    /// Number of capture groups in the pattern, not counting group 0.
    pub fn group_count(&self) -> usize {
        self.caps.len().saturating_sub(1)
    }

    /// Text of a group, `None` if it is unknown or did not participate.
    pub fn group(&self, key: &GroupKey) -> Option<&'t str> {
        let m = match key {
            GroupKey::Index(i) => self.caps.get(*i),
            GroupKey::Name(name) => self.caps.name(name),
        };
        m.map(|m| m.as_str())
    }

    /// Returns exactly one identifying string for this match.
    ///
    /// Without capture groups the whole match is returned and `key` is
    /// ignored. Otherwise the requested group is returned, with a group that
    /// did not participate yielding `""` and an unknown key failing with
    /// [`TieError::NoSuchGroup`].
    pub fn single_group(&self, key: &GroupKey) -> Result<&'t str> {
        if self.group_count() == 0 {
            return Ok(self.as_str());
        }
        let known = match key {
            GroupKey::Index(i) => *i < self.caps.len(),
            GroupKey::Name(name) => self.regex.capture_names().flatten().any(|n| n == name),
        };
        if !known {
            return Err(TieError::NoSuchGroup(key.to_string()));
        }
        Ok(self.group(key).unwrap_or(""))
    }
}

impl fmt::Debug for TagMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagMatch")
            .field("text", &self.as_str())
            .field("start", &self.start())
            .field("groups", &self.group_count())
            .finish()
    }
}

/// A user-defined template tag.
pub struct Tag {
    pattern: Pattern,
    processor: Arc<dyn Processor>,
    cache: Option<Mutex<HashMap<String, String>>>,
}

impl Tag {
    /// Compiles `pattern` with no flags and the default [`Sub`] processor.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_flags(pattern, Flags::empty())
    }

    /// Compiles `pattern` with `flags` and the default [`Sub`] processor.
    pub fn with_flags(pattern: &str, flags: Flags) -> Result<Self> {
        Ok(Self::from_pattern(Pattern::new(pattern, flags)?))
    }

    /// Wraps an already compiled regex.
    pub fn from_regex(regex: Regex) -> Self {
        Self::from_pattern(Pattern::from_regex(regex))
    }

    pub fn from_pattern(pattern: Pattern) -> Self {
        Self {
            pattern,
            processor: Arc::new(Sub::default()),
            cache: None,
        }
    }

    /// Replaces the processor. The processor is stored uninvoked.
    pub fn with_processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    /// Shares an existing processor between tags.
    pub fn with_shared_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = processor;
        self
    }

    /// Enables memoization of `matched text -> value` until
    /// [`clear_cache`](Self::clear_cache) is called.
    ///
    /// Cached values ignore later context changes, so only enable this for
    /// tags whose value does not vary between renders.
    pub fn cached(mut self) -> Self {
        self.cache = Some(Mutex::new(HashMap::new()));
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn processor(&self) -> &Arc<dyn Processor> {
        &self.processor
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Number of memoized values; always 0 for uncached tags.
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| {
            cache.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
            debug!(tag = %self, "cache cleared");
        }
    }

    /// All non-overlapping matches in `text`, left to right.
    ///
    /// The iterator is lazy. Calling this again scans from the start.
    pub fn matches<'t>(&'t self, text: &'t str) -> impl Iterator<Item = TagMatch<'t>> + 't {
        let regex = self.pattern.regex();
        regex
            .captures_iter(text)
            .map(move |caps| TagMatch { caps, regex })
    }

    /// Computes the replacement value for one match.
    ///
    /// A [`TieError::MissingVariable`] from the processor becomes an empty
    /// value and a warning pushed onto `warnings`. Any other error propagates.
    pub fn evaluate(
        &self,
        m: &TagMatch<'_>,
        ctx: &Context,
        warnings: &mut Vec<ContextWarning>,
    ) -> Result<String> {
        let text = m.as_str();
        if let Some(cache) = &self.cache {
            let cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = cache.get(text) {
                return Ok(value.clone());
            }
        }

        match self.processor.process(m, ctx) {
            Ok(value) => {
                if let Some(cache) = &self.cache {
                    cache
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(text.to_string(), value.clone());
                }
                Ok(value)
            }
            Err(TieError::MissingVariable { key }) => {
                warnings.push(ContextWarning::emit(key));
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Replaces every occurrence of this tag in `text`.
    pub fn process(&self, text: &str, ctx: &Context) -> Result<Rendered> {
        let mut out = text.to_string();
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        let mut num_matches = 0;

        for m in self.matches(text) {
            num_matches += 1;
            let src = m.as_str();
            debug!(tag = %self, matched = src, "tag matched");
            if src.is_empty() || !seen.insert(src) {
                continue;
            }
            let value = self.evaluate(&m, ctx, &mut warnings)?;
            debug!(tag = %self, value = %value, matched = src, "substituting");
            out = out.replace(src, &value);
        }

        debug!(tag = %self, num_matches, "processing done");
        Ok(Rendered::new(out, warnings))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Tag {}>", self.pattern)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("pattern", &self.pattern)
            .field("cached", &self.is_cached())
            .finish_non_exhaustive()
    }
}
