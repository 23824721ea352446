//! Render context, warnings and rendered output.
//!
//! A [`Context`] maps variable names to arbitrary JSON values. It is supplied
//! fresh on every render call and never mutated by the engine. JSON objects
//! stand in for both mappings (`['key']` access) and records (`.field`
//! access) when path expressions are evaluated.
//!
//! # Example
//!
//! ```rust
//! use tie::Context;
//! use serde_json::json;
//!
//! let ctx = Context::new()
//!     .with("name", "Bob")
//!     .with("items", json!([10, 20, 30]));
//!
//! assert_eq!(ctx.get("name"), Some(&json!("Bob")));
//! assert!(ctx.contains_key("items"));
//! ```

use std::fmt;
use std::ops::Deref;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, TieError};

/// Named values available for substitution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: Map<String, Value>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from any value that serializes to a JSON object.
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use tie::Context;
    ///
    /// #[derive(Serialize)]
    /// struct Page { title: String, views: u32 }
    ///
    /// let ctx = Context::from_serialize(&Page { title: "Home".into(), views: 3 }).unwrap();
    /// assert!(ctx.contains_key("title"));
    /// ```
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        match serde_json::to_value(data)? {
            Value::Object(vars) => Ok(Self { vars }),
            other => Err(TieError::Config(format!(
                "context must serialize to an object, got {}",
                value_kind(&other)
            ))),
        }
    }

    /// Adds a variable, consuming and returning the context.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a variable, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// Returns the underlying JSON map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.vars
    }
}

impl From<Map<String, Value>> for Context {
    fn from(vars: Map<String, Value>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Converts a context value to the text injected into a template.
///
/// Strings are inserted as-is, numbers and booleans through their display
/// form, `null` as the empty string, and arrays or objects as compact JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Short type name of a JSON value, used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Recoverable render-time notice: a tag key had no context variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextWarning {
    pub key: String,
}

impl ContextWarning {
    /// Creates the warning and emits it as a `tracing` event.
    pub(crate) fn emit(key: impl Into<String>) -> Self {
        let warning = Self { key: key.into() };
        tracing::warn!(key = %warning.key, "{}", warning);
        warning
    }
}

impl fmt::Display for ContextWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No context variable matched the tag {}", self.key)
    }
}

/// Output of a render or process call along with any warnings raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    text: String,
    warnings: Vec<ContextWarning>,
}

impl Rendered {
    pub fn new(text: String, warnings: Vec<ContextWarning>) -> Self {
        Self { text, warnings }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn warnings(&self) -> &[ContextWarning] {
        &self.warnings
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn into_parts(self) -> (String, Vec<ContextWarning>) {
        (self.text, self.warnings)
    }
}

impl Deref for Rendered {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq<str> for Rendered {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Rendered {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl From<Rendered> for String {
    fn from(rendered: Rendered) -> Self {
        rendered.text
    }
}
