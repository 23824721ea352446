//! Templates and the rendering pipeline.
//!
//! A [`Template`] holds a source string and a pluggable [`Renderer`]. The
//! default renderer applies the tags of the process-wide registry; any
//! closure `Fn(&Template, &Context) -> Result<Rendered>` can replace it.
//!
//! ## Rendering strategies
//!
//! | Strategy | Behavior |
//! |----------|----------|
//! | [`Strategy::Combined`] | Collect `matched text -> value` across all tags against the original source, then substitute everything in one pass |
//! | [`Strategy::Chained`] | Feed each tag's [`process`](crate::Tag::process) output to the next tag |
//!
//! With no tags at all, both strategies fall back to `{name}` interpolation
//! (see [`interpolate`]).
//!
//! ```rust
//! use tie::{Context, PriorityTagManager, RegistryRenderer, Template};
//!
//! let mut tags = PriorityTagManager::new();
//! tags.add_with_priority(r"%\w+%", 0).unwrap();
//!
//! let template = Template::new("dum %dummytag% dum")
//!     .with_renderer(RegistryRenderer::new(tags));
//! let ctx = Context::new().with("%dummytag%", "dummyval");
//!
//! assert_eq!(template.render(&ctx).unwrap(), "dum dummyval dum");
//! ```
//!
//! ## Key Types
//!
//! - [`Template`]: source plus renderer
//! - [`TemplateSet`]: named templates, optionally loaded from directories
//! - [`DefaultRenderer`] / [`RegistryRenderer`]: tag-based renderers

mod loader;
mod renderer;
mod simple;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{Context, Rendered};
use crate::error::{Result, TieError};

pub use loader::TemplateSet;
pub use renderer::{
    render_chained, render_tags, render_with_registry, DefaultRenderer, RegistryRenderer,
    Strategy,
};
pub use simple::interpolate;

/// Turns a template and a context into rendered text.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &Template, ctx: &Context) -> Result<Rendered>;
}

impl<F> Renderer for F
where
    F: Fn(&Template, &Context) -> Result<Rendered> + Send + Sync,
{
    fn render(&self, template: &Template, ctx: &Context) -> Result<Rendered> {
        self(template, ctx)
    }
}

/// A template source with its renderer.
#[derive(Clone)]
pub struct Template {
    name: String,
    source: String,
    renderer: Arc<dyn Renderer>,
}

impl Template {
    /// Creates an unnamed template using the [`DefaultRenderer`].
    pub fn new(source: impl Into<String>) -> Self {
        Self::named("", source)
    }

    pub fn named(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            renderer: Arc::new(DefaultRenderer::new()),
        }
    }

    /// Reads a template from disk, naming it after the file stem.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TieError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::named(name, source))
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn with_shared_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    /// Renders the template with `ctx`.
    pub fn render(&self, ctx: &Context) -> Result<Rendered> {
        info!(template = %self.name, "rendering template");
        debug!(vars = ?ctx.as_map(), "context vars");
        self.renderer.render(self, ctx)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::new(source)
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Template::new(source)
    }
}
