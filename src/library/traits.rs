//! Package traits
//!
//! Format-agnostic interfaces to an opened publication. The locator only
//! needs the spine, a navigation summary and a way to stream content
//! documents; how a package is stored is up to the implementation.

use std::io::{self, BufRead};

use super::error::LocateError;
use super::types::NavigationSummary;

/// An opened publication
pub trait PackageSource {
    /// Href of the content document at `spine_index` (0-based)
    fn spine_href(&self, spine_index: usize) -> Option<String>;

    /// Title, authors and table of contents
    fn navigation(&self) -> &NavigationSummary;

    /// Stream a content document by its href
    fn open_document(&self, href: &str) -> io::Result<Box<dyn BufRead>>;

    /// Release whatever the package holds (temporary files, archives)
    ///
    /// Called once when the package leaves the locator's cache.
    fn close(&mut self) {}
}

/// Opens packages from the prefix of a reference (usually a file path)
pub trait PackageOpener {
    fn open(&self, prefix: &str) -> Result<Box<dyn PackageSource>, LocateError>;
}

