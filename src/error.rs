//! Error types for CFI parsing and resolution

use std::sync::Arc;

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, CfiError>;

/// CFI error type
///
/// Syntax errors are raised once, at detection, and never recovered from
/// internally. Stream errors come from reading the target document and are
/// passed through unchanged.
#[derive(Debug, Error)]
pub enum CfiError {
    /// Malformed CFI text
    ///
    /// `position` is a byte offset into the parsed text, or 0 when a value
    /// was built directly rather than parsed.
    #[error("Syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },

    /// Failure while reading or decoding the XML document
    #[error("XML stream error: {0}")]
    Stream(#[from] quick_xml::Error),
}

impl CfiError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        CfiError::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Move a syntax error to `position` in the source text
    pub(crate) fn at(self, position: usize) -> Self {
        match self {
            CfiError::Syntax { message, .. } => CfiError::Syntax { message, position },
            other => other,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, CfiError::Syntax { .. })
    }
}

impl From<std::io::Error> for CfiError {
    fn from(err: std::io::Error) -> Self {
        CfiError::Stream(quick_xml::Error::Io(Arc::new(err)))
    }
}
