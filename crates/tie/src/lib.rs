//! # Tie - Regex Tag Substitution
//!
//! `tie` lets you define your own tag language: each [`Tag`] pairs a regular
//! expression with a [`Processor`] that computes the text to substitute for
//! every match. Tags are collected in a registry and applied to a
//! [`Template`] together.
//!
//! ## Core Concepts
//!
//! - [`Tag`]: compiled pattern plus processor, optionally memoized
//! - [`Sub`]: default processor, a context lookup keyed by the first group
//! - [`TagManager`] / [`PriorityTagManager`]: insertion-ordered and
//!   priority-ordered registries behind the [`TagRegistry`] trait
//! - [`Template`]: source text rendered by a pluggable [`Renderer`]
//! - [`Context`]: JSON values available to processors
//!
//! ## Quick Start
//!
//! ```rust
//! use tie::{Context, RegistryRenderer, Tag, TagManager, TagRegistry, Template};
//!
//! let mut tags = TagManager::new();
//! tags.add(Tag::new(r"%(\w+)%")?.into())?;
//! tags.add(r"\$\{(\S+?)\}".into())?;
//!
//! let template = Template::new("%greeting%, ${user.name}!")
//!     .with_renderer(RegistryRenderer::new(tags));
//! let ctx = Context::new()
//!     .with("greeting", "Hello")
//!     .with("user", serde_json::json!({"name": "Bob"}));
//!
//! assert_eq!(template.render(&ctx)?, "Hello, Bob!");
//! # Ok::<(), tie::TieError>(())
//! ```
//!
//! ## Missing variables
//!
//! A plain key that is not in the context renders as the empty string. The
//! miss is reported as a [`ContextWarning`], logged through `tracing` and
//! collected on the returned [`Rendered`]. Path expressions such as
//! `user.name` or `items[1]` fail the render instead (see [`LookupError`]).
//!
//! ## Process-wide registry
//!
//! [`register`] adds tags to a shared default registry used by templates
//! created with [`Template::new`]. [`set_registry`] swaps in any other
//! [`TagRegistry`] implementation.
//!
//! ## Configuration
//!
//! Registries can also be described in YAML or JSON, see [`RegistryConfig`].

pub mod config;
mod context;
mod error;
pub mod path;
mod pattern;
pub mod prelude;
mod processor;
pub mod registry;
mod tag;
pub mod template;

pub use context::{format_value, Context, ContextWarning, Rendered};
pub use error::{LookupError, Result, TieError};
pub use pattern::{Flags, Pattern};
pub use processor::{sub, Processor, Sub};
pub use tag::{GroupKey, Tag, TagMatch};

pub use config::{FlagName, GroupConfig, RegistryConfig, TagConfig};
pub use path::{is_path_expression, lookup, PathExpr, Step};
pub use registry::{
    default_tags, register, reset_registry, set_registry, with_registry, with_registry_mut,
    PriorityTagManager, TagManager, TagRegistry, TagSpec,
};
pub use template::{
    interpolate, render_chained, render_tags, render_with_registry, DefaultRenderer,
    RegistryRenderer, Renderer, Strategy, Template, TemplateSet,
};
