//! Placeholder substitution for template content.
//!
//! Templates reference parameters with `{{KEY}}`, where `KEY` is made of
//! ASCII letters, digits and underscores.
//!
//! # Rules
//!
//! - One pass only: substituted values are never rescanned
//! - A `{{` that does not start a well-formed placeholder is an error
//! - A key missing from the [`ParameterSet`] is an error naming the key and line
//!
//! # Example
//!
//! ```
//! use acforge::parameters::{substitute, ParameterSet};
//!
//! let params = ParameterSet::from_pairs([("NAME", "demo")]);
//! let out = substitute("A.md", "Hello {{NAME}}", &params).unwrap();
//! assert_eq!(out, "Hello demo");
//! ```

use crate::error::{ForgeError, Result};

use super::ParameterSet;

/// A segment of template text.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Literal text copied as is.
    Literal(&'a str),
    /// A `{{KEY}}` reference and the 1-based line it starts on.
    Placeholder { key: &'a str, line: usize },
}

/// Split template text into literal and placeholder segments.
///
/// `path` is only used for error reporting.
pub fn parse_placeholders<'a>(path: &str, input: &'a str) -> Result<Vec<Segment<'a>>> {
    let mut segments = Vec::new();
    let mut rest = input;
    let mut line = 1;

    while let Some(start) = rest.find("{{") {
        let (literal, tail) = rest.split_at(start);
        line += literal.matches('\n').count();
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let body = &tail[2..];
        let key_len = body
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();

        if key_len == 0 || !body[key_len..].starts_with("}}") {
            return Err(ForgeError::Substitution {
                path: path.to_string(),
                line,
                message: describe_malformed(body),
            });
        }

        segments.push(Segment::Placeholder {
            key: &body[..key_len],
            line,
        });
        rest = &body[key_len + 2..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    Ok(segments)
}

fn describe_malformed(body: &str) -> String {
    let snippet: String = body.lines().next().unwrap_or("").chars().take(24).collect();
    if !body.contains("}}") {
        format!("unterminated placeholder '{{{{{}'", snippet)
    } else {
        format!(
            "placeholder '{{{{{}' must be letters, digits or underscores followed by '}}}}'",
            snippet
        )
    }
}

/// Substitute every placeholder in `text`.
///
/// # Errors
///
/// Returns `ParameterMissing` for a key absent from `params`, or
/// `Substitution` for malformed placeholder syntax.
pub fn substitute(path: &str, text: &str, params: &ParameterSet) -> Result<String> {
    let segments = parse_placeholders(path, text)?;
    let mut result = String::with_capacity(text.len());

    for segment in segments {
        match segment {
            Segment::Literal(s) => result.push_str(s),
            Segment::Placeholder { key, line } => {
                let value = params.get(key).ok_or_else(|| ForgeError::ParameterMissing {
                    path: path.to_string(),
                    key: key.to_string(),
                    line,
                })?;
                result.push_str(value);
            }
        }
    }

    Ok(result)
}

/// Collect the distinct keys referenced by `text`, in first-use order.
pub fn referenced_keys(path: &str, text: &str) -> Result<Vec<String>> {
    let mut keys: Vec<String> = Vec::new();
    for segment in parse_placeholders(path, text)? {
        if let Segment::Placeholder { key, .. } = segment {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }
    Ok(keys)
}
