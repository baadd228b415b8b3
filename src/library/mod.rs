//! Locating references inside publications
//!
//! A [`Locator`] parses the CFI of a reference, opens the package named by
//! the reference prefix through a [`PackageOpener`], and resolves the path
//! down to a spine item, its navigation label and the addressed element.

mod error;
mod locator;
mod traits;
mod types;

pub use error::LocateError;
pub use locator::Locator;
pub use traits::{PackageOpener, PackageSource};
pub use types::{Location, NavEntry, NavigationSummary};
