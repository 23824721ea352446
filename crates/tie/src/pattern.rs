//! Compiled tag patterns and compilation flags.

use std::fmt;

use bitflags::bitflags;
use regex::{Regex, RegexBuilder};

use crate::error::{Result, TieError};

bitflags! {
    /// Pattern compilation flags.
    ///
    /// Each flag maps onto the matching [`RegexBuilder`] option.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// Letters match regardless of case (`(?i)`).
        const CASE_INSENSITIVE = 1 << 0;
        /// `^` and `$` match at line boundaries (`(?m)`).
        const MULTI_LINE = 1 << 1;
        /// `.` also matches `\n` (`(?s)`).
        const DOT_MATCHES_NEW_LINE = 1 << 2;
        /// Whitespace is ignored and `#` starts a comment (`(?x)`).
        const VERBOSE = 1 << 3;
        /// `\w`, `\d`, `\s`, their negations and `\b` only consider ASCII.
        /// `.` and other classes still match any code point.
        const ASCII = 1 << 4;
    }
}

/// An immutable compiled regular expression plus its source and flags.
#[derive(Clone)]
pub struct Pattern {
    regex: Regex,
    source: String,
    flags: Flags,
}

impl Pattern {
    /// Compiles `source` with `flags`.
    ///
    /// Fails with [`TieError::InvalidPattern`] on malformed syntax.
    pub fn new(source: &str, flags: Flags) -> Result<Self> {
        let compiled = if flags.contains(Flags::ASCII) {
            narrow_to_ascii(source, flags.contains(Flags::VERBOSE))
        } else {
            source.to_string()
        };
        let regex = RegexBuilder::new(&compiled)
            .case_insensitive(flags.contains(Flags::CASE_INSENSITIVE))
            .multi_line(flags.contains(Flags::MULTI_LINE))
            .dot_matches_new_line(flags.contains(Flags::DOT_MATCHES_NEW_LINE))
            .ignore_whitespace(flags.contains(Flags::VERBOSE))
            .build()
            .map_err(|source_err| TieError::InvalidPattern {
                pattern: source.to_string(),
                source: source_err,
            })?;

        Ok(Self {
            regex,
            source: source.to_string(),
            flags,
        })
    }

    /// Wraps an already compiled regex. Its flags are reported as empty;
    /// inline flags stay part of the source.
    pub fn from_regex(regex: Regex) -> Self {
        Self {
            source: regex.as_str().to_string(),
            regex,
            flags: Flags::empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("flags", &self.flags)
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Pattern::from_regex(regex)
    }
}

/// Rewrites the Perl classes and `\b` into their ASCII forms.
///
/// Outside a bracket class `\w` becomes `[[:word:]]` and `\b` becomes
/// `(?-u:\b)`; inside one, `\w` becomes `[:word:]`. The regex stays in
/// Unicode mode, so the result still only matches valid UTF-8.
fn narrow_to_ascii(source: &str, verbose: bool) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    let mut chars = source.chars().peekable();
    let mut depth = 0usize;
    // Right after `[` or `[^`, where `]` is a literal.
    let mut class_start = false;

    while let Some(ch) = chars.next() {
        let at_class_start = std::mem::take(&mut class_start);
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => match ascii_class(escaped) {
                    Some(name) if depth > 0 => {
                        out.push_str("[:");
                        out.push_str(name);
                        out.push_str(":]");
                    }
                    Some(name) => {
                        out.push_str("[[:");
                        out.push_str(name);
                        out.push_str(":]]");
                    }
                    // `\b{start}` and friends are left alone.
                    None if escaped == 'b' && depth == 0 && chars.peek() != Some(&'{') => {
                        out.push_str(r"(?-u:\b)");
                    }
                    None => {
                        out.push('\\');
                        out.push(escaped);
                    }
                },
                None => out.push('\\'),
            },
            '[' if depth > 0 && chars.peek() == Some(&':') => {
                out.push('[');
                let mut prev = '\0';
                for c in chars.by_ref() {
                    out.push(c);
                    if prev == ':' && c == ']' {
                        break;
                    }
                    prev = c;
                }
            }
            '[' => {
                depth += 1;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
                class_start = true;
            }
            ']' if depth > 0 && !at_class_start => {
                depth -= 1;
                out.push(']');
            }
            '#' if verbose && depth == 0 => {
                out.push('#');
                for c in chars.by_ref() {
                    out.push(c);
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

fn ascii_class(escape: char) -> Option<&'static str> {
    match escape {
        'w' => Some("word"),
        'W' => Some("^word"),
        'd' => Some("digit"),
        'D' => Some("^digit"),
        's' => Some("space"),
        'S' => Some("^space"),
        _ => None,
    }
}
