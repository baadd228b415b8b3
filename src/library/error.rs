//! Locator error types

use thiserror::Error;

use crate::cache::CacheError;
use crate::error::CfiError;

/// Errors raised while locating a reference inside a publication
#[derive(Debug, Error)]
pub enum LocateError {
    /// Parsing or resolution failure
    #[error(transparent)]
    Cfi(#[from] CfiError),

    /// Open package bookkeeping failure
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The package could not be opened or read
    #[error("Package error: {0}")]
    Package(String),

    /// The spine has no item at this index
    #[error("Spine item not found: index {0}")]
    SpineItemNotFound(usize),

    /// The expression does not start at a spine item (`/6/N`)
    #[error("Reference does not address a spine item: {0}")]
    Unaddressable(String),

    /// Content document could not be opened
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
