//! CFI Comparison and Ordering
//!
//! Implements the sorting rules of
//! <https://idpf.org/epub/linking/cfi/epub-cfi.html#sec-sorting>.
//!
//! Two paths are walked in lock-step while their entries are equal. At the
//! first divergence (or once one side runs out of entries) the "tails" are
//! compared: the next entry, or the terminal offset, or nothing. Tails of
//! different kinds rank by a fixed precedence, least significant first:
//!
//! ```text
//! absent < :char < ~time < ~time@x:y < @x:y < /step < !
//! ```
//!
//! Tails of the same kind compare by value. Assertions never participate.

use std::cmp::Ordering;

use super::reference::split;
use super::types::*;

/// What follows the common prefix of two paths
#[derive(Debug, Clone, Copy)]
enum Tail<'a> {
    Absent,
    Offset(&'a Offset),
    Entry(&'a Entry),
}

impl<'a> Tail<'a> {
    fn after(path: &'a Path, common: usize) -> Self {
        match path.entries().get(common) {
            Some(entry) => Tail::Entry(entry),
            None => path.offset().map_or(Tail::Absent, Tail::Offset),
        }
    }

    /// Kind precedence, lowest first
    fn rank(&self) -> u8 {
        match self {
            Tail::Absent => 0,
            Tail::Offset(Offset::Character { .. }) => 1,
            Tail::Offset(Offset::Temporal { .. }) => 2,
            Tail::Offset(Offset::TemporalSpatial { .. }) => 3,
            Tail::Offset(Offset::Spatial { .. }) => 4,
            Tail::Entry(Entry::Step(_)) => 5,
            Tail::Entry(Entry::Redirect) => 6,
        }
    }

    fn compare(&self, other: &Tail<'_>) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| match (self, other) {
            (Tail::Entry(Entry::Step(a)), Tail::Entry(Entry::Step(b))) => a.index.cmp(&b.index),
            (Tail::Offset(a), Tail::Offset(b)) => a.fields().cmp(&b.fields()),
            // redirects are always equal, absent tails too
            _ => Ordering::Equal,
        })
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        let common = self
            .entries()
            .iter()
            .zip(other.entries())
            .take_while(|(a, b)| a == b)
            .count();

        Tail::after(self, common).compare(&Tail::after(other, common))
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Determine if path `a` comes before path `b` in reading order
pub fn is_before(a: &Path, b: &Path) -> bool {
    a < b
}

/// Determine if path `a` comes after path `b` in reading order
pub fn is_after(a: &Path, b: &Path) -> bool {
    a > b
}

/// Check if a path falls within a range (bounds included)
pub fn is_in_range(path: &Path, range: &Range) -> bool {
    let start = Path::joined(range.parent(), range.start());
    let end = Path::joined(range.parent(), range.end());
    *path >= start && *path <= end
}

/// Compare the reading positions of two reference strings
///
/// Each side is reduced to the path a reader lands on (a range's absolute
/// start). Returns None if either reference has no valid CFI.
pub fn compare_references(a: &str, b: &str) -> Option<Ordering> {
    let (_, expression_a) = split(a).ok()?;
    let (_, expression_b) = split(b).ok()?;
    Some(expression_a?.position().cmp(&expression_b?.position()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfi::parser::parse_expression;
    use proptest::prelude::*;

    fn path(input: &str) -> Path {
        parse_expression(input).unwrap().position()
    }

    #[test]
    fn test_ordering_same_chapter() {
        let a = path("/6/4!/4/2/1:10");
        let b = path("/6/4!/4/2/1:20");

        assert!(a < b);
        assert!(is_before(&a, &b));
        assert!(is_after(&b, &a));
    }

    #[test]
    fn test_ordering_different_chapters() {
        assert!(path("/6/4!/4/2") < path("/6/6!/4/2"));
        assert!(path("/6/4!/4/2") < path("/6/4!/4/4"));
    }

    #[test]
    fn test_deeper_path_comes_after() {
        assert!(path("/6/4!/4/2") < path("/6/4!/4/2/1"));
    }

    #[test]
    fn test_type_precedence() {
        let character = path("/6/4/2:5");
        let temporal = path("/6/4/2~5");
        let temporal_spatial = path("/6/4/2~5@1:1");
        let spatial = path("/6/4/2@1:1");
        let step = path("/6/4/2/1");
        let redirect = path("/6/4/2!/4");
        let absent = path("/6/4/2");

        let ascending = [
            &absent,
            &character,
            &temporal,
            &temporal_spatial,
            &spatial,
            &step,
            &redirect,
        ];
        for pair in ascending.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_precedence_beats_value() {
        // a large character offset still ranks below any step
        assert!(path("/6/4:999") < path("/6/4/0"));
        // and any step ranks below a redirect
        assert!(path("/6/4/999") < path("/6/4!/2"));
    }

    #[test]
    fn test_offsets_compare_lexicographically() {
        assert!(path("/2@1:9") < path("/2@2:0"));
        assert!(path("/2@1:2") < path("/2@1:3"));
        assert!(path("/2~1@5:5") < path("/2~2@0:0"));
    }

    #[test]
    fn test_equality_ignores_assertions() {
        let a = path("/6/4[chap01ref]!/4/2/1:42[yes]");
        let b = path("/6/4!/4/2/1:42");

        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_redirects_compare_equal() {
        assert_eq!(path("/2!/4").cmp(&path("/2!/4")), Ordering::Equal);
    }

    #[test]
    fn test_range_ordering() {
        let a = parse_expression("/6/4,/2,/4").unwrap();
        let b = parse_expression("/6/4,/2,/6").unwrap();
        let c = parse_expression("/6/6,/2,/2").unwrap();
        let (a, b, c) = (a.as_range().unwrap(), b.as_range().unwrap(), c.as_range().unwrap());

        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn test_in_range() {
        let range = parse_expression("/6/4!/4/2/1,:0,:100").unwrap();
        let range = range.as_range().unwrap();

        assert!(is_in_range(&path("/6/4!/4/2/1:50"), range));
        assert!(is_in_range(&path("/6/4!/4/2/1:0"), range));
        assert!(!is_in_range(&path("/6/4!/4/2/1:150"), range));
    }

    #[test]
    fn test_sort_paths() {
        let mut paths = vec![
            path("/6/8!/4/2/1:50"),
            path("/6/4!/4/2/1:10"),
            path("/6/6!/4/2/1:30"),
            path("/6/4!/4/2/1:5"),
        ];

        paths.sort();

        let sorted: Vec<String> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(
            sorted,
            vec!["/6/4!/4/2/1:5", "/6/4!/4/2/1:10", "/6/6!/4/2/1:30", "/6/8!/4/2/1:50"]
        );
    }

    #[test]
    fn test_compare_references() {
        assert_eq!(
            compare_references("book.epub#epubcfi(/6/4!/4/2/1:10)", "epubcfi(/6/4!/4/2/1:20)"),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_references("epubcfi(/6/4!/4,/2/1:3,/2/1:9)", "epubcfi(/6/4!/4/2/1:3)"),
            Some(Ordering::Equal)
        );
        assert_eq!(compare_references("invalid", "epubcfi(/6/4!/4/2)"), None);
        assert_eq!(compare_references("epubcfi(/06)", "epubcfi(/6/4!/4/2)"), None);
    }

    fn arb_offset() -> impl Strategy<Value = Option<Offset>> {
        prop_oneof![
            Just(None),
            (0u32..3).prop_map(|v| Some(Offset::character(v))),
            (0u32..3).prop_map(|s| Some(Offset::temporal(s))),
            (0u32..3, 0u32..3).prop_map(|(x, y)| Some(Offset::spatial(x, y))),
            (0u32..3, 0u32..3, 0u32..3)
                .prop_map(|(s, x, y)| Some(Offset::temporal_spatial(s, x, y))),
        ]
    }

    fn arb_entry() -> impl Strategy<Value = Entry> {
        prop_oneof![
            4 => (0u32..5).prop_map(|i| Entry::Step(Step::new(i))),
            1 => Just(Entry::Redirect),
        ]
    }

    fn arb_path() -> impl Strategy<Value = Path> {
        (prop::collection::vec(arb_entry(), 1..5), arb_offset())
            .prop_filter_map("path invariants", |(entries, offset)| {
                Path::new(entries, offset).ok()
            })
    }

    proptest! {
        #[test]
        fn prop_exactly_one_relation_holds(a in arb_path(), b in arb_path()) {
            let relations = [a < b, a == b, a > b];
            prop_assert_eq!(relations.iter().filter(|r| **r).count(), 1);
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }

        #[test]
        fn prop_equality_matches_canonical_form(a in arb_path(), b in arb_path()) {
            prop_assert_eq!(a == b, a.to_string() == b.to_string());
        }

        #[test]
        fn prop_ordering_is_transitive(a in arb_path(), b in arb_path(), c in arb_path()) {
            let orders = [(&a, &b, &c), (&a, &c, &b), (&b, &a, &c), (&b, &c, &a), (&c, &a, &b), (&c, &b, &a)];
            for (x, y, z) in orders {
                if x <= y && y <= z {
                    prop_assert!(x <= z, "{} <= {} <= {}", x, y, z);
                }
                if x < y && y <= z {
                    prop_assert!(x < z, "{} < {} <= {}", x, y, z);
                }
            }
        }

        #[test]
        fn prop_parse_roundtrip(a in arb_path()) {
            let reparsed = parse_expression(&a.to_string()).unwrap();
            prop_assert_eq!(reparsed.as_path(), Some(&a));
        }
    }
}
