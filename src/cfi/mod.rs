//! CFI (Canonical Fragment Identifier) module for EPUB
//!
//! This module provides tokenizing, parsing, formatting and ordering of EPUB
//! CFI expressions.
//!
//! # Overview
//!
//! A CFI addresses a location inside a publication by walking child indices
//! from the package document down into a content document.
//!
//! # Example CFI
//!
//! ```text
//! epubcfi(/6/4[chap01ref]!/4/2/1:42)
//!         │  │           │ │ │ │ └── character offset 42
//!         │  │           │ │ │ └──── text run (odd = character data)
//!         │  │           │ │ └────── element index
//!         │  │           │ └──────── element index (body)
//!         │  │           └────────── redirect (into content doc)
//!         │  └────────────────────── spine item with assertion
//!         └───────────────────────── spine element
//! ```
//!
//! # Usage
//!
//! ```
//! use epubcfi::cfi::{is_before, split, to_absolute};
//!
//! let (prefix, expression) = split("book.epub#epubcfi(/6/4!/4,/2/1:3,/2/1:9)").unwrap();
//! assert_eq!(prefix, "book.epub");
//!
//! let (start, end) = to_absolute(expression.unwrap().as_range().unwrap());
//! assert_eq!(start.to_string(), "/6/4!/4/2/1:3");
//! assert!(is_before(&start, &end));
//! ```

mod assertion;
mod comparator;
mod parser;
mod reference;
mod tokenizer;
mod types;

// Re-export model types
pub use types::{Entry, Expression, Offset, Path, Range, Step, SPINE_STEP_INDEX};

// Re-export tokenizer and parser
pub use parser::parse_expression;
pub use tokenizer::{tokenize, Symbol, Token, Tokenizer};

// Re-export reference helpers
pub use reference::{capture_expression, format, format_reference, split, to_absolute};

// Re-export comparator functions
pub use comparator::{compare_references, is_after, is_before, is_in_range};
