//! Locator types

use serde::{Deserialize, Serialize};

use crate::cfi::Expression;
use crate::resolve::Resolved;

/// One table-of-contents entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub label: String,
    /// Href of the target document, possibly with a `#fragment`
    pub path: String,
}

/// What a package exposes about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationSummary {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub entries: Vec<NavEntry>,
}

impl NavEntry {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

impl NavigationSummary {
    /// Label of the first entry pointing at `href`
    ///
    /// Fragments and a leading `./` are ignored on both sides.
    pub fn label_for(&self, href: &str) -> Option<&str> {
        let target = normalize_href(href);
        self.entries
            .iter()
            .find(|entry| normalize_href(&entry.path) == target)
            .map(|entry| entry.label.as_str())
    }
}

fn normalize_href(href: &str) -> &str {
    let href = href.split('#').next().unwrap_or(href);
    href.strip_prefix("./").unwrap_or(href)
}

/// Where a reference points
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    /// No usable CFI; the reference is a plain path
    Plain { path: String },
    /// A spine item, and the element inside it when the CFI goes that deep
    Addressed {
        prefix: String,
        expression: Expression,
        spine_index: usize,
        href: String,
        label: Option<String>,
        element: Option<Resolved>,
    },
}

impl Location {
    /// Navigation label, for addressed locations that have one
    pub fn label(&self) -> Option<&str> {
        match self {
            Location::Addressed { label, .. } => label.as_deref(),
            Location::Plain { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> NavigationSummary {
        NavigationSummary {
            title: Some("Sample".to_string()),
            authors: vec!["Anonymous".to_string()],
            entries: vec![
                NavEntry::new("Cover", "cover.xhtml"),
                NavEntry::new("Introduction", "./Text/intro.xhtml#start"),
                NavEntry::new("Introduction, part two", "Text/intro.xhtml#later"),
            ],
        }
    }

    #[test]
    fn test_label_for_ignores_fragment_and_dot() {
        let summary = summary();
        assert_eq!(summary.label_for("Text/intro.xhtml"), Some("Introduction"));
        assert_eq!(summary.label_for("./cover.xhtml#top"), Some("Cover"));
        assert_eq!(summary.label_for("Text/chap01.xhtml"), None);
    }

    #[test]
    fn test_summary_deserialize_defaults() {
        let summary: NavigationSummary = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert!(summary.authors.is_empty());
        assert!(summary.entries.is_empty());
    }
}
