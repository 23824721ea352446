//! Tag processing callbacks.
//!
//! A processor receives one [`TagMatch`] and the render [`Context`] and
//! returns the text to inject. Any `Fn(&TagMatch, &Context) -> Result<String>`
//! closure is a processor.
//!
//! Processors should be side-effect free so a tag can be shared between
//! registries and rendered concurrently. To fall back to an empty
//! substitution (and raise a [`ContextWarning`](crate::ContextWarning)),
//! return [`TieError::MissingVariable`].

use crate::context::{format_value, Context};
use crate::error::{Result, TieError};
use crate::path::{self, is_path_expression};
use crate::tag::{GroupKey, TagMatch};

/// Computes the replacement value for one tag match.
pub trait Processor: Send + Sync {
    fn process(&self, m: &TagMatch<'_>, ctx: &Context) -> Result<String>;
}

impl<F> Processor for F
where
    F: Fn(&TagMatch<'_>, &Context) -> Result<String> + Send + Sync,
{
    fn process(&self, m: &TagMatch<'_>, ctx: &Context) -> Result<String> {
        self(m, ctx)
    }
}

/// The default processor: substitutes a context value for the tag.
///
/// The tag key is the configured group (first group by default), or the
/// whole match when the pattern has no groups. Keys containing `.` or a
/// bracketed index are evaluated as path expressions and their errors
/// propagate. Plain keys missing from the context yield
/// [`TieError::MissingVariable`].
///
/// ```rust
/// use tie::{Context, Sub, Tag};
///
/// let tag = Tag::new(r"\[(?P<k>\w+)\|(?P<v>\w+)\]")
///     .unwrap()
///     .with_processor(Sub::with_group("v"));
/// let ctx = Context::new().with("b", "bee");
///
/// assert_eq!(tag.process("[a|b]", &ctx).unwrap(), "bee");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sub {
    group: GroupKey,
}

impl Sub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `group` as the tag key instead of the first group.
    pub fn with_group(group: impl Into<GroupKey>) -> Self {
        Self {
            group: group.into(),
        }
    }

    pub fn group(&self) -> &GroupKey {
        &self.group
    }
}

impl Processor for Sub {
    fn process(&self, m: &TagMatch<'_>, ctx: &Context) -> Result<String> {
        let key = m.single_group(&self.group)?;
        if is_path_expression(key) {
            let value = path::lookup(key, ctx)?;
            return Ok(format_value(&value));
        }
        match ctx.get(key) {
            Some(value) => Ok(format_value(value)),
            None => Err(TieError::MissingVariable {
                key: key.to_string(),
            }),
        }
    }
}

/// Default processing with the first-group key.
pub fn sub(m: &TagMatch<'_>, ctx: &Context) -> Result<String> {
    Sub::default().process(m, ctx)
}
