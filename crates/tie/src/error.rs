//! Error types for tag construction, registration and rendering.
//!
//! Construction and registration errors ([`TieError::InvalidPattern`],
//! [`TieError::InvalidTag`]) always surface to the caller. A direct variable
//! lookup that misses the context is reported through
//! [`TieError::MissingVariable`], which the engine recovers into an empty
//! substitution plus a [`ContextWarning`](crate::ContextWarning). Path
//! expression failures ([`LookupError`]) abort the render.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the tie engine.
#[derive(Debug, Error)]
pub enum TieError {
    /// The pattern could not be compiled into a regular expression.
    #[error("invalid tag pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A registry was handed something it cannot turn into a tag.
    #[error("invalid tag: {0}")]
    InvalidTag(String),

    /// A direct lookup key is absent from the context.
    ///
    /// Processors return this to request the empty-string fallback.
    #[error("no context variable matched the tag {key}")]
    MissingVariable { key: String },

    /// A path expression could not be resolved against the context.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The requested capture group does not exist in the pattern.
    #[error("no such group: {0}")]
    NoSuchGroup(String),

    /// Malformed `{name}` placeholder in a template rendered without tags.
    #[error("format error: {0}")]
    Format(String),

    /// No template with the given name is known.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Two templates loaded from one directory share a name.
    #[error("duplicate template name: {0}")]
    DuplicateTemplate(String),

    /// A template file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry configuration could not be parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TieError {
    /// Returns true for the recoverable missing-variable case.
    pub fn is_missing_variable(&self) -> bool {
        matches!(self, TieError::MissingVariable { .. })
    }
}

impl From<serde_yaml::Error> for TieError {
    fn from(err: serde_yaml::Error) -> Self {
        TieError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TieError {
    fn from(err: serde_json::Error) -> Self {
        TieError::Config(err.to_string())
    }
}

/// Failures while evaluating a path expression such as `items[1]` or
/// `user.name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The root identifier is not in the context.
    #[error("name {0:?} is not defined")]
    UndefinedVariable(String),

    /// `.name` access on a value without that field.
    #[error("{path} has no attribute {name:?}")]
    MissingAttribute { path: String, name: String },

    /// `['key']` access on a mapping without that key.
    #[error("{path} has no key {key:?}")]
    MissingKey { path: String, key: String },

    /// `[index]` access past the end of a sequence.
    #[error("index {index} out of range for {path} (length {len})")]
    IndexOutOfRange {
        path: String,
        index: i64,
        len: usize,
    },

    /// Access step applied to a value of the wrong shape.
    #[error("{path} is a {kind} and cannot be accessed with {step}")]
    NotIndexable {
        path: String,
        kind: &'static str,
        step: String,
    },

    /// The expression does not follow the accessor grammar.
    #[error("invalid path expression {expr:?} at offset {offset}: {message}")]
    Syntax {
        expr: String,
        offset: usize,
        message: String,
    },
}

/// Result type for tie operations.
pub type Result<T> = std::result::Result<T, TieError>;
