//! Resolution of CFI steps against XML documents
//!
//! Given the step indices of one path segment (everything after a redirect,
//! or a package path), find the element they address in a single streaming
//! pass, along with the document title.

mod engine;

pub use engine::{element_steps, resolve, resolve_file, Resolved, ROOT_ELEMENT_INDEX};
