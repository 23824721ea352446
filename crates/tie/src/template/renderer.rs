//! Tag-based renderers.
//!
//! # Combined rendering
//!
//! [`render_tags`] scans the original source once per tag and builds a map
//! from each exact matched text to its value. Two rules make the result
//! deterministic:
//!
//! - When tags match identical text, the tag that comes last in iteration
//!   order provides the value.
//! - Distinct matched texts are tried longest first, so `%name%` wins over
//!   `name` at the same position. Equal lengths keep first-seen order.
//!   A match that starts earlier still wins over a longer one that overlaps
//!   it, so tags `ab` and `bcd` turn `abcd` into the value of `ab` plus `cd`.
//!
//! All keys are then substituted in a single left-to-right pass over the
//! original source. Inserted values are never re-scanned.
//!
//! # Chained rendering
//!
//! [`render_chained`] applies [`Tag::process`] for each tag in turn, feeding
//! the output of one tag to the next. A value that happens to match a later
//! tag will be substituted again.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use regex::{Captures, Regex};
use tracing::debug;

use super::simple::interpolate;
use super::{Renderer, Template};
use crate::context::{Context, Rendered};
use crate::error::{Result, TieError};
use crate::registry::{default_tags, TagRegistry};
use crate::tag::Tag;

/// How a tag renderer composes its tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Single substitution pass over the original source.
    #[default]
    Combined,
    /// Each tag processes the previous tag's output.
    Chained,
}

impl Strategy {
    /// Renders `source` with `tags` using this strategy.
    pub fn apply(self, tags: &[Arc<Tag>], source: &str, ctx: &Context) -> Result<Rendered> {
        match self {
            Strategy::Combined => render_tags(tags, source, ctx),
            Strategy::Chained => render_chained(tags, source, ctx),
        }
    }
}

/// Renders `source` with an explicit, ordered set of tags.
///
/// With no tags, falls back to `{name}` interpolation. If tags exist but none
/// matches, the source is returned unchanged.
pub fn render_tags(tags: &[Arc<Tag>], source: &str, ctx: &Context) -> Result<Rendered> {
    if tags.is_empty() {
        debug!("no tags registered, falling back to interpolation");
        return interpolate(source, ctx);
    }

    let mut warnings = Vec::new();
    let mut values: HashMap<&str, String> = HashMap::new();
    let mut keys: Vec<&str> = Vec::new();

    for tag in tags {
        let mut seen = HashSet::new();
        for m in tag.matches(source) {
            let text = m.as_str();
            if text.is_empty() || !seen.insert(text) {
                continue;
            }
            debug!(tag = %tag, matched = text, "tag matched");
            let value = tag.evaluate(&m, ctx, &mut warnings)?;
            if values.insert(text, value).is_none() {
                keys.push(text);
            }
        }
    }

    if keys.is_empty() {
        return Ok(Rendered::new(source.to_string(), warnings));
    }

    // Stable sort: equal lengths keep first-seen order.
    keys.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = keys
        .iter()
        .map(|key| regex::escape(key))
        .collect::<Vec<_>>()
        .join("|");
    let combined = Regex::new(&alternation).map_err(|source| TieError::InvalidPattern {
        pattern: alternation.clone(),
        source,
    })?;

    let out = combined.replace_all(source, |caps: &Captures<'_>| {
        values.get(&caps[0]).cloned().unwrap_or_default()
    });
    debug!(keys = keys.len(), "combined substitution done");
    Ok(Rendered::new(out.into_owned(), warnings))
}

/// Renders `source` by applying each tag's `process` in order.
pub fn render_chained(tags: &[Arc<Tag>], source: &str, ctx: &Context) -> Result<Rendered> {
    if tags.is_empty() {
        debug!("no tags registered, falling back to interpolation");
        return interpolate(source, ctx);
    }

    let mut out = source.to_string();
    let mut warnings = Vec::new();
    for tag in tags {
        let (text, tag_warnings) = tag.process(&out, ctx)?.into_parts();
        out = text;
        warnings.extend(tag_warnings);
    }
    Ok(Rendered::new(out, warnings))
}

/// Renders `source` with the tags of `registry`.
pub fn render_with_registry(
    registry: &dyn TagRegistry,
    source: &str,
    ctx: &Context,
) -> Result<Rendered> {
    render_tags(&registry.tags(), source, ctx)
}

/// Renderer bound to the process-wide default registry.
///
/// The registry is read at render time, so tags registered after the
/// template was created still apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRenderer {
    strategy: Strategy,
}

impl DefaultRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(strategy: Strategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
}

impl Renderer for DefaultRenderer {
    fn render(&self, template: &Template, ctx: &Context) -> Result<Rendered> {
        let tags = default_tags();
        self.strategy.apply(&tags, template.source(), ctx)
    }
}

/// Renderer bound to an explicit registry.
#[derive(Clone)]
pub struct RegistryRenderer {
    registry: Arc<dyn TagRegistry>,
    strategy: Strategy,
}

impl RegistryRenderer {
    pub fn new(registry: impl TagRegistry + 'static) -> Self {
        Self::shared(Arc::new(registry))
    }

    /// Shares one registry between several renderers.
    pub fn shared(registry: Arc<dyn TagRegistry>) -> Self {
        Self {
            registry,
            strategy: Strategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn registry(&self) -> &Arc<dyn TagRegistry> {
        &self.registry
    }
}

impl Renderer for RegistryRenderer {
    fn render(&self, template: &Template, ctx: &Context) -> Result<Rendered> {
        let tags = self.registry.tags();
        self.strategy.apply(&tags, template.source(), ctx)
    }
}

impl fmt::Debug for RegistryRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryRenderer")
            .field("tags", &self.registry.len())
            .field("strategy", &self.strategy)
            .finish()
    }
}
