//! Reference strings
//!
//! A reference is whatever text points into a publication, typically a file
//! path followed by a CFI fragment: `book.epub#epubcfi(/6/4!/4/2/1:10)`.
//! The fragment is only recognized at the very end of the string, either
//! after a `#` or as the whole string.

use std::ops::Range as Span;
use std::sync::LazyLock;

use regex::Regex;

use super::parser::parse_expression;
use super::types::{Expression, Path, Range};
use crate::error::Result;

static EXPRESSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:#|^)epubcfi\((.*)\)$").expect("expression pattern is a valid regex")
});

/// Locate a trailing `epubcfi(...)`
///
/// Returns the byte span of the whole match (the `#` included) and the text
/// between the parentheses.
pub fn capture_expression(text: &str) -> Option<(Span<usize>, &str)> {
    let captures = EXPRESSION_PATTERN.captures(text)?;
    let whole = captures.get(0)?;
    let inner = captures.get(1)?;
    Some((whole.range(), inner.as_str()))
}

/// Split a reference into its prefix and parsed expression
///
/// Without a recognizable `epubcfi(...)` the whole text is the prefix and no
/// expression is returned. A fragment that is present but malformed is an
/// error.
pub fn split(text: &str) -> Result<(&str, Option<Expression>)> {
    match capture_expression(text) {
        Some((span, inner)) => {
            let expression = parse_expression(inner)?;
            Ok((&text[..span.start], Some(expression)))
        }
        None => Ok((text, None)),
    }
}

/// Canonical string form of an expression, without the `epubcfi(...)` wrapper
pub fn format(expression: &Expression) -> String {
    expression.to_string()
}

/// Build a full reference string: `prefix#epubcfi(expression)`
///
/// An empty prefix yields the bare `epubcfi(...)` form.
pub fn format_reference(prefix: &str, expression: &Expression) -> String {
    if prefix.is_empty() {
        format!("epubcfi({})", expression)
    } else {
        format!("{}#epubcfi({})", prefix, expression)
    }
}

/// Absolute start and end paths of a range
pub fn to_absolute(range: &Range) -> (Path, Path) {
    (
        Path::joined(range.parent(), range.start()),
        Path::joined(range.parent(), range.end()),
    )
}
