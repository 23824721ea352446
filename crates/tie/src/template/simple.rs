//! `{name}` interpolation used when no tags are registered.
//!
//! # Syntax
//!
//! - `{name}` - variable substitution, surrounding whitespace is trimmed
//! - `{user.name}`, `{items[1]}` - path expressions
//! - `{{` and `}}` - escaped braces (render as `{` and `}`)
//!
//! A stray `}` is kept as-is. A variable missing from the context renders as
//! the empty string and raises a [`ContextWarning`].

use tracing::debug;

use crate::context::{format_value, Context, ContextWarning, Rendered};
use crate::error::{Result, TieError};
use crate::path::{self, is_path_expression};

/// Substitutes `{name}` placeholders in `template` from `ctx`.
///
/// ```rust
/// use tie::{interpolate, Context};
///
/// let ctx = Context::new().with("name", "Bob");
/// assert_eq!(interpolate("Hello {name} {{ok}}", &ctx).unwrap(), "Hello Bob {ok}");
/// ```
pub fn interpolate(template: &str, ctx: &Context) -> Result<Rendered> {
    let mut result = String::with_capacity(template.len());
    let mut warnings = Vec::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                result.push('{');
            }
            '{' => {
                let mut var_name = String::new();
                let mut found_close = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        found_close = true;
                        break;
                    }
                    var_name.push(inner);
                }

                if !found_close {
                    return Err(TieError::Format(format!(
                        "unclosed variable substitution: {{{}",
                        var_name
                    )));
                }
                let var_name = var_name.trim();
                if var_name.is_empty() {
                    return Err(TieError::Format(
                        "empty variable name in template".to_string(),
                    ));
                }

                if is_path_expression(var_name) {
                    let value = path::lookup(var_name, ctx)?;
                    result.push_str(&format_value(&value));
                } else if let Some(value) = ctx.get(var_name) {
                    result.push_str(&format_value(value));
                } else {
                    warnings.push(ContextWarning::emit(var_name));
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                result.push('}');
            }
            _ => result.push(ch),
        }
    }

    debug!(warnings = warnings.len(), "interpolation done");
    Ok(Rendered::new(result, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use serde_json::json;

    fn render(template: &str, ctx: &Context) -> String {
        interpolate(template, ctx).unwrap().into_string()
    }

    #[test]
    fn test_simple_substitution() {
        let ctx = Context::new().with("name", "World");
        assert_eq!(render("Hello, {name}!", &ctx), "Hello, World!");
    }

    #[test]
    fn test_multiple_variables() {
        let ctx = Context::new().with("first", "John").with("last", "Doe");
        assert_eq!(render("{first} {last}", &ctx), "John Doe");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let ctx = Context::new().with("name", "Bob");
        assert_eq!(render("{ name }", &ctx), "Bob");
    }

    #[test]
    fn test_escaped_braces() {
        let ctx = Context::new().with("x", 1);
        assert_eq!(render("{{x}} = {x}", &ctx), "{x} = 1");
    }

    #[test]
    fn test_stray_closing_brace() {
        assert_eq!(render("a } b", &Context::new()), "a } b");
    }

    #[test]
    fn test_path_expressions() {
        let ctx = Context::new()
            .with("user", json!({"name": "Bob", "tags": ["a", "b"]}))
            .with("items", json!([10, 20, 30]));
        assert_eq!(render("{user.name} {items[1]} {user.tags[-1]}", &ctx), "Bob 20 b");
    }

    #[test]
    fn test_missing_variable_warns() {
        let out = interpolate("Hello {name}!", &Context::new()).unwrap();
        assert_eq!(out, "Hello !");
        assert_eq!(out.warnings().len(), 1);
        assert_eq!(out.warnings()[0].key, "name");
    }

    #[test]
    fn test_path_error_propagates() {
        let ctx = Context::new().with("items", json!([10]));
        let err = interpolate("{items[3]}", &ctx).unwrap_err();
        assert!(matches!(
            err,
            TieError::Lookup(LookupError::IndexOutOfRange { index: 3, len: 1, .. })
        ));
    }

    #[test]
    fn test_unclosed_placeholder() {
        let err = interpolate("Hello {name", &Context::new()).unwrap_err();
        assert!(matches!(err, TieError::Format(ref msg) if msg.contains("unclosed")));
    }

    #[test]
    fn test_empty_placeholder() {
        let err = interpolate("Hello {  }", &Context::new()).unwrap_err();
        assert!(matches!(err, TieError::Format(_)));
    }

    #[test]
    fn test_values_are_formatted() {
        let ctx = Context::new()
            .with("n", 26)
            .with("ok", true)
            .with("nothing", json!(null));
        assert_eq!(render("{n}/{ok}/{nothing}", &ctx), "26/true/");
    }
}
