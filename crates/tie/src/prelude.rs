//! Prelude for convenient imports.
//!
//! ```rust
//! use tie::prelude::*;
//!
//! let tag = Tag::new(r"%(\w+)%")?;
//! let out = tag.process("hi %who%", &Context::new().with("who", "you"))?;
//! assert_eq!(out, "hi you");
//! # Ok::<(), TieError>(())
//! ```

// Core types
pub use crate::context::{Context, ContextWarning, Rendered};
pub use crate::error::{Result, TieError};
pub use crate::pattern::Flags;
pub use crate::processor::{Processor, Sub};
pub use crate::tag::{GroupKey, Tag, TagMatch};

// Registries
pub use crate::registry::{register, PriorityTagManager, TagManager, TagRegistry, TagSpec};

// Rendering
pub use crate::template::{RegistryRenderer, Renderer, Strategy, Template, TemplateSet};
