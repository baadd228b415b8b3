//! CFI (Canonical Fragment Identifier) types for EPUB
//!
//! A parsed expression is either a single [`Path`] or a [`Range`] made of a
//! shared parent path and two relative paths.
//! Format: epubcfi(/6/4[chap01ref]!/4/2/22/3:268)
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use serde::{Deserialize, Serialize};
use std::fmt;

use super::assertion::write_assertion;
use crate::error::{CfiError, Result};

/// Index of the spine element among the package document's children
pub const SPINE_STEP_INDEX: u32 = 6;

/// A child step (`/N`), optionally carrying an assertion (`/N[id]`)
///
/// Assertions are carried for serialization only; they never take part in
/// equality or ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Child index (even = element, odd = character data run)
    pub index: u32,
    /// Raw assertion text, escapes preserved
    pub assertion: Option<String>,
}

/// Terminal offset of a path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Offset {
    /// `:N` character offset into a text run
    Character {
        value: u32,
        assertion: Option<String>,
    },
    /// `~S` time offset in seconds (audio/video)
    Temporal {
        seconds: u32,
        assertion: Option<String>,
    },
    /// `@X:Y` point inside an image
    Spatial {
        x: u32,
        y: u32,
        assertion: Option<String>,
    },
    /// `~S@X:Y` point at a given time
    TemporalSpatial {
        seconds: u32,
        x: u32,
        y: u32,
        assertion: Option<String>,
    },
}

/// One entry of a path: a child step or an indirection (`!`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    Step(Step),
    /// Continue addressing inside the referenced document
    Redirect,
}

/// A CFI path: steps and redirects with an optional terminal offset
///
/// Invariants, checked by [`Path::new`]:
/// - not empty (relative range ends may be a bare offset, as in `,:227`)
/// - no two adjacent redirects
/// - a trailing redirect must be followed by an offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPath")]
pub struct Path {
    entries: Vec<Entry>,
    offset: Option<Offset>,
}

/// A CFI range: `parent,start,end`
///
/// `start` and `end` are relative to `parent`. The parent never begins with a
/// redirect and carries no offset of its own, so it always ends with a step.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct Range {
    parent: Path,
    start: Path,
    end: Path,
}

/// Result of parsing a CFI expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    Path(Path),
    Range(Range),
}

#[derive(Deserialize)]
struct RawPath {
    entries: Vec<Entry>,
    offset: Option<Offset>,
}

#[derive(Deserialize)]
struct RawRange {
    parent: Path,
    start: Path,
    end: Path,
}

impl TryFrom<RawPath> for Path {
    type Error = CfiError;

    fn try_from(raw: RawPath) -> Result<Self> {
        Path::new(raw.entries, raw.offset)
    }
}

impl TryFrom<RawRange> for Range {
    type Error = CfiError;

    fn try_from(raw: RawRange) -> Result<Self> {
        Range::new(raw.parent, raw.start, raw.end)
    }
}

impl Step {
    /// Create a step without assertion
    pub fn new(index: u32) -> Self {
        Self {
            index,
            assertion: None,
        }
    }

    /// Create a step with an assertion (`/4[chap01ref]`)
    pub fn with_assertion(index: u32, assertion: impl Into<String>) -> Self {
        Self {
            index,
            assertion: Some(assertion.into()),
        }
    }

    /// Even indices address elements, odd ones address character data
    pub fn is_element(&self) -> bool {
        self.index % 2 == 0
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Step {}

impl Offset {
    /// Create a character offset without assertion
    pub fn character(value: u32) -> Self {
        Offset::Character {
            value,
            assertion: None,
        }
    }

    /// Create a temporal offset without assertion
    pub fn temporal(seconds: u32) -> Self {
        Offset::Temporal {
            seconds,
            assertion: None,
        }
    }

    /// Create a spatial offset without assertion
    pub fn spatial(x: u32, y: u32) -> Self {
        Offset::Spatial {
            x,
            y,
            assertion: None,
        }
    }

    /// Create a temporal-spatial offset without assertion
    pub fn temporal_spatial(seconds: u32, x: u32, y: u32) -> Self {
        Offset::TemporalSpatial {
            seconds,
            x,
            y,
            assertion: None,
        }
    }

    /// The assertion attached to this offset, if any
    pub fn assertion(&self) -> Option<&str> {
        match self {
            Offset::Character { assertion, .. }
            | Offset::Temporal { assertion, .. }
            | Offset::Spatial { assertion, .. }
            | Offset::TemporalSpatial { assertion, .. } => assertion.as_deref(),
        }
    }

    /// Numeric fields in significance order, used for equality and ordering
    pub(crate) fn fields(&self) -> [u32; 3] {
        match *self {
            Offset::Character { value, .. } => [value, 0, 0],
            Offset::Temporal { seconds, .. } => [seconds, 0, 0],
            Offset::Spatial { x, y, .. } => [x, y, 0],
            Offset::TemporalSpatial { seconds, x, y, .. } => [seconds, x, y],
        }
    }
}

impl PartialEq for Offset {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.fields() == other.fields()
    }
}

impl Eq for Offset {}

impl Entry {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Entry::Redirect)
    }

    pub fn as_step(&self) -> Option<&Step> {
        match self {
            Entry::Step(step) => Some(step),
            Entry::Redirect => None,
        }
    }
}

impl Path {
    /// Build a path, enforcing the redirect placement rules
    ///
    /// Built values have no source text, so errors carry position 0; the
    /// parser rewrites it to the offset in its input.
    pub fn new(entries: Vec<Entry>, offset: Option<Offset>) -> Result<Self> {
        if entries.is_empty() && offset.is_none() {
            return Err(CfiError::syntax(0, "a path needs a step, a redirect or an offset"));
        }
        if entries
            .windows(2)
            .any(|pair| pair[0].is_redirect() && pair[1].is_redirect())
        {
            return Err(CfiError::syntax(0, "two consecutive redirects"));
        }
        if offset.is_none() && entries.last().is_some_and(Entry::is_redirect) {
            return Err(CfiError::syntax(
                0,
                "a redirect must be followed by a step or an offset",
            ));
        }
        Ok(Self { entries, offset })
    }

    /// Join a range parent and one of its relative paths
    ///
    /// [`Range::new`] guarantees the parent ends with a step and has no
    /// offset, so appending any valid path keeps the redirect rules intact.
    pub(crate) fn joined(prefix: &Path, tail: &Path) -> Self {
        let mut entries = Vec::with_capacity(prefix.entries.len() + tail.entries.len());
        entries.extend(prefix.entries.iter().cloned());
        entries.extend(tail.entries.iter().cloned());
        Self {
            entries,
            offset: tail.offset.clone(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn offset(&self) -> Option<&Offset> {
        self.offset.as_ref()
    }

    pub fn starts_with_redirect(&self) -> bool {
        self.entries.first().is_some_and(Entry::is_redirect)
    }

    /// Step indices of the whole path, redirects skipped
    pub fn steps(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter_map(Entry::as_step)
            .map(|step| step.index)
            .collect()
    }

    /// Step indices grouped per document
    ///
    /// The first segment addresses the document the path starts in; every
    /// redirect opens a new segment. `/6/4!/4/2` yields `[[6, 4], [4, 2]]`.
    pub fn segments(&self) -> Vec<Vec<u32>> {
        let mut segments = vec![Vec::new()];
        for entry in &self.entries {
            match entry {
                Entry::Step(step) => {
                    if let Some(current) = segments.last_mut() {
                        current.push(step.index);
                    }
                }
                Entry::Redirect => segments.push(Vec::new()),
            }
        }
        segments
    }

    /// 0-based spine index for paths of the form `/6/N...`
    ///
    /// Spine items are children of the spine element, so `/6/2` is the first
    /// item, `/6/4` the second and so on.
    pub fn spine_index(&self) -> Option<usize> {
        match self.entries.as_slice() {
            [Entry::Step(spine), Entry::Step(item), ..]
                if spine.index == SPINE_STEP_INDEX && item.is_element() && item.index > 0 =>
            {
                Some((item.index / 2 - 1) as usize)
            }
            _ => None,
        }
    }
}

impl Range {
    /// Build a range
    ///
    /// The parent may not begin with a redirect nor carry an offset. Errors
    /// carry position 0, as in [`Path::new`].
    pub fn new(parent: Path, start: Path, end: Path) -> Result<Self> {
        if parent.starts_with_redirect() {
            return Err(CfiError::syntax(0, "range parent cannot start with \"!\""));
        }
        if parent.offset.is_some() {
            return Err(CfiError::syntax(0, "range parent cannot have an offset"));
        }
        Ok(Self { parent, start, end })
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    pub fn start(&self) -> &Path {
        &self.start
    }

    pub fn end(&self) -> &Path {
        &self.end
    }
}

impl Expression {
    pub fn is_range(&self) -> bool {
        matches!(self, Expression::Range(_))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Expression::Path(path) => Some(path),
            Expression::Range(_) => None,
        }
    }

    pub fn as_range(&self) -> Option<&Range> {
        match self {
            Expression::Path(_) => None,
            Expression::Range(range) => Some(range),
        }
    }

    /// The location a reader lands on: the path itself, or a range's
    /// absolute start
    pub fn position(&self) -> Path {
        match self {
            Expression::Path(path) => path.clone(),
            Expression::Range(range) => Path::joined(&range.parent, &range.start),
        }
    }
}

impl From<Path> for Expression {
    fn from(path: Path) -> Self {
        Expression::Path(path)
    }
}

impl From<Range> for Expression {
    fn from(range: Range) -> Self {
        Expression::Range(range)
    }
}

// Display implementations produce the canonical string form

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.index)?;
        write_assertion(f, self.assertion.as_deref())
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Character { value, .. } => write!(f, ":{}", value)?,
            Offset::Temporal { seconds, .. } => write!(f, "~{}", seconds)?,
            Offset::Spatial { x, y, .. } => write!(f, "@{}:{}", x, y)?,
            Offset::TemporalSpatial { seconds, x, y, .. } => {
                write!(f, "~{}@{}:{}", seconds, x, y)?
            }
        }
        write_assertion(f, self.assertion())
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Step(step) => fmt::Display::fmt(step, f),
            Entry::Redirect => write!(f, "!"),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{}", entry)?;
        }
        if let Some(ref offset) = self.offset {
            write!(f, "{}", offset)?;
        }
        Ok(())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.parent, self.start, self.end)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Path(path) => fmt::Display::fmt(path, f),
            Expression::Range(range) => fmt::Display::fmt(range, f),
        }
    }
}
