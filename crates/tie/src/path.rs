//! Path expressions: attribute, index and key traversal into context values.
//!
//! A path expression is a root identifier followed by any number of steps:
//!
//! - `.name` reads a field of an object
//! - `[2]` or `[-1]` indexes an array (or the characters of a string)
//! - `['key']` or `["key"]` reads a key of an object
//!
//! ```text
//! user.name
//! items[1]
//! config['build dir'].path
//! ```
//!
//! Expressions are parsed by hand and evaluated by dispatching over the JSON
//! value's shape. Nothing is ever executed. Each failing step reports the
//! natural error for that access (see [`LookupError`]).

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::context::{value_kind, Context};
use crate::error::LookupError;

static PATH_SYNTAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[.+\]|\.").expect("path syntax pattern is valid"));

/// Returns true when `key` uses attribute or index syntax and must be
/// evaluated as a path instead of a direct variable name.
pub fn is_path_expression(key: &str) -> bool {
    PATH_SYNTAX.is_match(key)
}

/// A single access step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Attr(String),
    Index(i64),
    Key(String),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Attr(name) => write!(f, ".{}", name),
            Step::Index(index) => write!(f, "[{}]", index),
            Step::Key(key) => write!(f, "[{:?}]", key),
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    root: String,
    steps: Vec<Step>,
}

impl PathExpr {
    /// Parses an expression, rejecting anything outside the accessor grammar.
    pub fn parse(expr: &str) -> Result<Self, LookupError> {
        Parser::new(expr).parse()
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Evaluates the expression against `ctx`.
    pub fn resolve<'c>(&self, ctx: &'c Context) -> Result<Cow<'c, Value>, LookupError> {
        let root = ctx
            .get(&self.root)
            .ok_or_else(|| LookupError::UndefinedVariable(self.root.clone()))?;

        let mut path = self.root.clone();
        let mut current = Cow::Borrowed(root);
        for step in &self.steps {
            current = match current {
                Cow::Borrowed(value) => apply_step(value, step, &path)?,
                Cow::Owned(value) => Cow::Owned(apply_step(&value, step, &path)?.into_owned()),
            };
            path.push_str(&step.to_string());
        }
        Ok(current)
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// Parses and resolves `expr` in one go.
pub fn lookup<'c>(expr: &str, ctx: &'c Context) -> Result<Cow<'c, Value>, LookupError> {
    PathExpr::parse(expr)?.resolve(ctx)
}

fn apply_step<'v>(value: &'v Value, step: &Step, path: &str) -> Result<Cow<'v, Value>, LookupError> {
    match (step, value) {
        (Step::Attr(name), Value::Object(map)) => {
            map.get(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| LookupError::MissingAttribute {
                    path: path.to_string(),
                    name: name.clone(),
                })
        }
        (Step::Attr(name), _) => Err(LookupError::MissingAttribute {
            path: path.to_string(),
            name: name.clone(),
        }),
        (Step::Key(key), Value::Object(map)) => {
            map.get(key)
                .map(Cow::Borrowed)
                .ok_or_else(|| LookupError::MissingKey {
                    path: path.to_string(),
                    key: key.clone(),
                })
        }
        (Step::Index(index), Value::Array(items)) => {
            let slot = normalize_index(*index, items.len()).ok_or(LookupError::IndexOutOfRange {
                path: path.to_string(),
                index: *index,
                len: items.len(),
            })?;
            Ok(Cow::Borrowed(&items[slot]))
        }
        (Step::Index(index), Value::String(s)) => {
            let len = s.chars().count();
            let slot = normalize_index(*index, len).ok_or(LookupError::IndexOutOfRange {
                path: path.to_string(),
                index: *index,
                len,
            })?;
            let ch = s.chars().nth(slot).map(String::from).unwrap_or_default();
            Ok(Cow::Owned(Value::String(ch)))
        }
        // Object keys are always strings, so an integer index reads the
        // stringified key.
        (Step::Index(index), Value::Object(map)) => {
            let key = index.to_string();
            map.get(&key)
                .map(Cow::Borrowed)
                .ok_or_else(|| LookupError::MissingKey {
                    path: path.to_string(),
                    key,
                })
        }
        (step, other) => Err(LookupError::NotIndexable {
            path: path.to_string(),
            kind: value_kind(other),
            step: step.to_string(),
        }),
    }
}

/// Maps a possibly negative index onto `0..len`.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let slot = if index < 0 { len + index } else { index };
    if (0..len).contains(&slot) {
        usize::try_from(slot).ok()
    } else {
        None
    }
}

struct Parser<'a> {
    expr: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self { expr, pos: 0 }
    }

    fn parse(mut self) -> Result<PathExpr, LookupError> {
        self.skip_whitespace();
        let root = self.identifier()?;
        let mut steps = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('.') => {
                    self.bump();
                    self.skip_whitespace();
                    steps.push(Step::Attr(self.identifier()?));
                }
                Some('[') => {
                    self.bump();
                    self.skip_whitespace();
                    let step = match self.peek() {
                        Some(quote @ ('\'' | '"')) => {
                            self.bump();
                            Step::Key(self.quoted(quote)?)
                        }
                        _ => Step::Index(self.integer()?),
                    };
                    self.skip_whitespace();
                    self.expect(']')?;
                    steps.push(step);
                }
                Some(ch) => return Err(self.error(format!("unexpected character {:?}", ch))),
            }
        }

        Ok(PathExpr { root, steps })
    }

    fn peek(&self) -> Option<char> {
        self.expr[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LookupError> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected {:?}, found {:?}", expected, ch))),
            None => Err(self.error(format!("expected {:?}, found end of input", expected))),
        }
    }

    fn identifier(&mut self) -> Result<String, LookupError> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                self.bump();
            }
            _ => return Err(self.error("expected an identifier")),
        }
        while self.peek().is_some_and(|ch| ch.is_alphanumeric() || ch == '_') {
            self.bump();
        }
        Ok(self.expr[start..self.pos].to_string())
    }

    fn integer(&mut self) -> Result<i64, LookupError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.bump();
        }
        let expr = self.expr;
        match expr[start..self.pos].parse() {
            Ok(index) => Ok(index),
            Err(_) => {
                self.pos = start;
                Err(self.error("expected an integer index or a quoted key"))
            }
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, LookupError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string key")),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(self.error("unterminated string key")),
                },
                Some(ch) if ch == quote => return Ok(out),
                Some(ch) => out.push(ch),
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> LookupError {
        LookupError::Syntax {
            expr: self.expr.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }
}
