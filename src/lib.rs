//! EPUB CFI library
//!
//! Parsing, formatting and ordering of EPUB Canonical Fragment Identifiers,
//! plus streaming resolution of CFI steps against XML documents.
//!
//! # Modules
//!
//! - `cfi`: Tokenizer, parser, path model and ordering
//! - `resolve`: One-pass step resolution over `quick-xml` events
//! - `cache`: FIFO-bounded cache with a release hook
//! - `library`: Reference locator over pluggable package sources
//! - `config`: Environment configuration

pub mod cache;
pub mod cfi;
pub mod config;
pub mod error;
pub mod library;
pub mod resolve;

pub use cache::{BoundedCache, CacheError};
pub use cfi::{parse_expression, split, Expression, Path, Range};
pub use config::Config;
pub use error::{CfiError, Result};
pub use library::{LocateError, Location, Locator};
pub use resolve::{resolve, Resolved};
