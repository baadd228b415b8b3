//! Assertion reader
//!
//! Assertions are the bracketed annotations after a step or offset
//! (`/4[chap01ref]`, `:10[yes,^[no^]]`). Their content is opaque here: the
//! text between the brackets is kept verbatim, including `^` escapes, so that
//! serializing a parsed path reproduces the original characters.

use std::fmt;

use crate::error::{CfiError, Result};

/// CFI escape character; the next character is taken literally
const ESCAPE: char = '^';

/// Read an assertion body up to the matching unescaped `]`.
///
/// The opening `[` (at byte `open_pos`) must already be consumed. The closing
/// `]` is consumed and not included in the result.
pub(crate) fn read_assertion<I>(source: &mut I, open_pos: usize) -> Result<String>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut text = String::new();
    let mut escaped = false;

    for (_, ch) in source.by_ref() {
        if escaped {
            text.push(ch);
            escaped = false;
        } else if ch == ESCAPE {
            text.push(ch);
            escaped = true;
        } else if ch == ']' {
            return Ok(text);
        } else {
            text.push(ch);
        }
    }

    Err(CfiError::syntax(open_pos, "unclosed assertion"))
}

/// Write `[assertion]` if present
pub(crate) fn write_assertion(f: &mut fmt::Formatter<'_>, assertion: Option<&str>) -> fmt::Result {
    match assertion {
        Some(text) => write!(f, "[{}]", text),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &str) -> Result<String> {
        let mut source = input.char_indices();
        read_assertion(&mut source, 0)
    }

    #[test]
    fn test_reads_until_bracket() {
        assert_eq!(read("chap01ref]/4").unwrap(), "chap01ref");
    }

    #[test]
    fn test_leaves_rest_of_input() {
        let mut source = "id]/2".char_indices();
        read_assertion(&mut source, 0).unwrap();
        let rest: String = source.map(|(_, ch)| ch).collect();
        assert_eq!(rest, "/2");
    }

    #[test]
    fn test_escaped_bracket_kept_verbatim() {
        assert_eq!(read("test^]value]").unwrap(), "test^]value");
        assert_eq!(read("a^^]").unwrap(), "a^^");
    }

    #[test]
    fn test_empty_assertion() {
        assert_eq!(read("]").unwrap(), "");
    }

    #[test]
    fn test_unclosed_assertion() {
        assert!(matches!(read("never closed"), Err(CfiError::Syntax { .. })));
        assert!(read("escaped^]").is_err());
    }
}
