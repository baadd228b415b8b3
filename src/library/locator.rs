//! Reference locator
//!
//! Turns a reference such as `book.epub#epubcfi(/6/16!/4/2/1:32)` into a
//! [`Location`]: the spine item it points at, its table-of-contents label and
//! the element addressed inside the content document.
//!
//! Opened packages are kept in a [`BoundedCache`] keyed by prefix; a package
//! pushed out of the cache is closed immediately.

use std::num::NonZeroUsize;

use tracing::{debug, warn};

use super::error::LocateError;
use super::traits::{PackageOpener, PackageSource};
use super::types::Location;
use crate::cache::{BoundedCache, CacheError};
use crate::cfi::{capture_expression, split, Path};
use crate::config::Config;
use crate::resolve::{element_steps, resolve};

/// Resolves references against packages opened on demand
pub struct Locator<O: PackageOpener> {
    opener: O,
    packages: BoundedCache<String, Box<dyn PackageSource>>,
}

impl<O: PackageOpener> Locator<O> {
    /// Create a locator keeping at most `capacity` packages open
    pub fn new(opener: O, capacity: NonZeroUsize) -> Self {
        let packages = BoundedCache::new(
            capacity,
            |prefix: String, mut package: Box<dyn PackageSource>| {
                debug!(%prefix, "Closing package");
                package.close();
            },
        );
        Self { opener, packages }
    }

    /// Create a locator sized from configuration
    pub fn from_config(opener: O, config: &Config) -> Self {
        Self::new(opener, config.cache_capacity)
    }

    /// Prefixes of the currently open packages, oldest first
    pub fn open_packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Close every open package
    pub fn close_all(&mut self) {
        self.packages.clear();
    }

    /// Locate a reference
    ///
    /// References without a CFI, or with a malformed one, come back as
    /// [`Location::Plain`].
    pub fn locate(&mut self, reference: &str) -> Result<Location, LocateError> {
        let (prefix, expression) = match split(reference) {
            Ok((prefix, Some(expression))) => (prefix, expression),
            Ok((_, None)) => {
                return Ok(Location::Plain {
                    path: reference.to_string(),
                })
            }
            Err(err) => {
                warn!(reference, error = %err, "Malformed CFI, treating reference as a plain path");
                let path = capture_expression(reference)
                    .map_or(reference, |(span, _)| &reference[..span.start]);
                return Ok(Location::Plain {
                    path: path.to_string(),
                });
            }
        };

        let position = expression.position();
        let spine_index = position
            .spine_index()
            .ok_or_else(|| LocateError::Unaddressable(reference.to_string()))?;

        let package = self.package(prefix)?;
        let href = package
            .spine_href(spine_index)
            .ok_or(LocateError::SpineItemNotFound(spine_index))?;
        let label = package.navigation().label_for(&href).map(str::to_string);

        let element = match content_steps(&position) {
            Some(steps) => {
                debug!(%href, ?steps, "Resolving inside content document");
                let document = package.open_document(&href)?;
                resolve(document, &steps)?
            }
            None => None,
        };

        Ok(Location::Addressed {
            prefix: prefix.to_string(),
            expression,
            spine_index,
            href,
            label,
            element,
        })
    }

    /// Open package for `prefix`, opening it on first use
    fn package(&mut self, prefix: &str) -> Result<&mut Box<dyn PackageSource>, LocateError> {
        if !self.packages.contains(prefix) {
            debug!(prefix, "Opening package");
            let package = self.opener.open(prefix)?;
            self.packages.insert(prefix.to_string(), package);
        }
        self.packages
            .get_mut(prefix)
            .ok_or_else(|| CacheError::NotFound(prefix.to_string()).into())
    }
}

impl<O: PackageOpener> Drop for Locator<O> {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Element steps inside the first content document
///
/// `None` when the path never leaves the package document. Trailing
/// character-data steps are dropped: they select text, and the element
/// holding that text is what gets resolved.
fn content_steps(path: &Path) -> Option<Vec<u32>> {
    let steps = path.segments().into_iter().nth(1)?;
    Some(element_steps(&steps).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{NavEntry, NavigationSummary};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::io::{self, BufRead, Cursor};
    use std::rc::Rc;

    const INTRO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <head><title>Introduction</title></head>
  <body>
    <section id="intro">
      <p>First paragraph.</p>
    </section>
  </body>
</html>
"#;

    struct MemoryPackage {
        spine: Vec<String>,
        navigation: NavigationSummary,
        documents: HashMap<String, String>,
        closed: Rc<Cell<bool>>,
    }

    impl PackageSource for MemoryPackage {
        fn spine_href(&self, spine_index: usize) -> Option<String> {
            self.spine.get(spine_index).cloned()
        }

        fn navigation(&self) -> &NavigationSummary {
            &self.navigation
        }

        fn open_document(&self, href: &str) -> io::Result<Box<dyn BufRead>> {
            let text = self
                .documents
                .get(href)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, href.to_string()))?;
            Ok(Box::new(Cursor::new(text.clone().into_bytes())))
        }

        fn close(&mut self) {
            self.closed.set(true);
        }
    }

    /// Opener that records every prefix it opens and hands out close flags
    #[derive(Default)]
    struct MemoryOpener {
        opened: RefCell<Vec<String>>,
        closed: RefCell<HashMap<String, Rc<Cell<bool>>>>,
    }

    impl MemoryOpener {
        fn is_closed(&self, prefix: &str) -> bool {
            self.closed.borrow().get(prefix).is_some_and(|flag| flag.get())
        }
    }

    impl PackageOpener for Rc<MemoryOpener> {
        fn open(&self, prefix: &str) -> Result<Box<dyn PackageSource>, LocateError> {
            if prefix.ends_with(".broken") {
                return Err(LocateError::Package(format!("cannot open {}", prefix)));
            }

            let spine: Vec<String> = (1..=9)
                .map(|n| match n {
                    8 => "Text/intro.xhtml".to_string(),
                    n => format!("Text/chap{:02}.xhtml", n),
                })
                .collect();
            let navigation = NavigationSummary {
                title: Some("Sample".to_string()),
                authors: Vec::new(),
                entries: vec![
                    NavEntry::new("Chapter 1", "Text/chap01.xhtml"),
                    NavEntry::new("Introduction", "Text/intro.xhtml#intro"),
                ],
            };
            let documents = HashMap::from([("Text/intro.xhtml".to_string(), INTRO.to_string())]);

            let closed = Rc::new(Cell::new(false));
            self.opened.borrow_mut().push(prefix.to_string());
            self.closed
                .borrow_mut()
                .insert(prefix.to_string(), Rc::clone(&closed));

            Ok(Box::new(MemoryPackage {
                spine,
                navigation,
                documents,
                closed,
            }))
        }
    }

    fn locator(capacity: usize) -> (Rc<MemoryOpener>, Locator<Rc<MemoryOpener>>) {
        let opener = Rc::new(MemoryOpener::default());
        let locator = Locator::new(Rc::clone(&opener), NonZeroUsize::new(capacity).unwrap());
        (opener, locator)
    }

    #[test]
    fn test_label_from_navigation() {
        let (_, mut locator) = locator(2);
        let location = locator.locate("sample.epub#epubcfi(/6/16!:32)").unwrap();

        assert_eq!(location.label(), Some("Introduction"));
        match location {
            Location::Addressed {
                prefix,
                spine_index,
                href,
                element,
                ..
            } => {
                assert_eq!(prefix, "sample.epub");
                assert_eq!(spine_index, 7);
                assert_eq!(href, "Text/intro.xhtml");
                let element = element.unwrap();
                assert_eq!(element.tag, "html");
                assert_eq!(element.title.as_deref(), Some("Introduction"));
            }
            other => panic!("expected an addressed location, got {:?}", other),
        }
    }

    #[test]
    fn test_element_inside_document() {
        let (_, mut locator) = locator(2);
        let location = locator
            .locate("sample.epub#epubcfi(/6/16[intro]!/4/2[intro]/2/1:5)")
            .unwrap();

        let Location::Addressed { element, .. } = location else {
            panic!("expected an addressed location");
        };
        let element = element.unwrap();
        assert_eq!(element.tag, "p");
    }

    #[test]
    fn test_range_uses_start() {
        let (_, mut locator) = locator(2);
        let location = locator
            .locate("sample.epub#epubcfi(/6/16!/4,/2/2/1:0,/2/2/1:6)")
            .unwrap();

        let Location::Addressed { element, expression, .. } = location else {
            panic!("expected an addressed location");
        };
        assert!(expression.is_range());
        assert_eq!(element.unwrap().tag, "p");
    }

    #[test]
    fn test_package_path_without_redirect() {
        let (_, mut locator) = locator(2);
        let location = locator.locate("sample.epub#epubcfi(/6/2)").unwrap();

        let Location::Addressed { href, element, label, .. } = location else {
            panic!("expected an addressed location");
        };
        assert_eq!(href, "Text/chap01.xhtml");
        assert_eq!(label.as_deref(), Some("Chapter 1"));
        assert!(element.is_none());
    }

    #[test]
    fn test_plain_references() {
        let (opener, mut locator) = locator(2);

        let location = locator.locate("notes/sample.epub").unwrap();
        assert!(matches!(location, Location::Plain { path } if path == "notes/sample.epub"));

        let location = locator.locate("sample.epub#epubcfi(/6/016!:3)").unwrap();
        assert!(matches!(location, Location::Plain { path } if path == "sample.epub"));

        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn test_missing_spine_item() {
        let (_, mut locator) = locator(2);
        let result = locator.locate("sample.epub#epubcfi(/6/40!/4)");
        assert!(matches!(result, Err(LocateError::SpineItemNotFound(19))));
    }

    #[test]
    fn test_unaddressable_expression() {
        let (_, mut locator) = locator(2);
        let result = locator.locate("sample.epub#epubcfi(/4/2!/4)");
        assert!(matches!(result, Err(LocateError::Unaddressable(_))));
    }

    #[test]
    fn test_missing_document() {
        let (_, mut locator) = locator(2);
        let result = locator.locate("sample.epub#epubcfi(/6/4!/4/2)");
        assert!(matches!(result, Err(LocateError::Io(_))));
    }

    #[test]
    fn test_opener_failure() {
        let (_, mut locator) = locator(2);
        let result = locator.locate("sample.broken#epubcfi(/6/16!:32)");
        assert!(matches!(result, Err(LocateError::Package(_))));
        assert_eq!(locator.open_packages().count(), 0);
    }

    #[test]
    fn test_packages_reused_and_evicted() {
        let (opener, mut locator) = locator(2);

        for prefix in ["a.epub", "b.epub", "a.epub", "c.epub"] {
            locator
                .locate(&format!("{}#epubcfi(/6/16!:32)", prefix))
                .unwrap();
        }

        assert_eq!(*opener.opened.borrow(), vec!["a.epub", "b.epub", "c.epub"]);
        assert_eq!(locator.open_packages().collect::<Vec<_>>(), vec!["b.epub", "c.epub"]);
        assert!(opener.is_closed("a.epub"));
        assert!(!opener.is_closed("b.epub"));

        drop(locator);
        assert!(opener.is_closed("b.epub"));
        assert!(opener.is_closed("c.epub"));
    }

    #[test]
    fn test_content_steps() {
        let path = |text: &str| crate::cfi::parse_expression(text).unwrap().position();

        assert_eq!(content_steps(&path("/6/4")), None);
        assert_eq!(content_steps(&path("/6/4!/4/2/1:3")), Some(vec![4, 2]));
        assert_eq!(content_steps(&path("/6/4!:3")), Some(vec![]));
        assert_eq!(content_steps(&path("/6/4!/4/10!/2")), Some(vec![4, 10]));
    }
}
