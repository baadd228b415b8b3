//! Streaming step resolution
//!
//! Walks an XML document once, numbering children the way CFI steps do:
//! elements get even indices (2, 4, 6, ...), runs of character data between
//! them get odd ones. A run that is absent still occupies its odd slot, so two
//! adjacent elements are numbered 2 and 4.
//!
//! The steps to resolve are consumed root-most first. The document root is
//! addressed by an implicit first step [`ROOT_ELEMENT_INDEX`], which is why
//! `/4/2` in a content document selects the first child of `<body>`.
//!
//! While walking, the first `<title>` directly under `html > head` is
//! collected. The walk stops as soon as both answers are known, or as soon as
//! no element left in the stream can match.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;

/// Index of the document element, as seen from the synthetic document node
pub const ROOT_ELEMENT_INDEX: u32 = 2;

/// Ancestor chain of the title element, matched on local names
const TITLE_CHAIN: [&str; 3] = ["html", "head", "title"];

/// The element a step list resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    /// Qualified tag name, prefix included
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Text of the document's `html > head > title`
    pub title: Option<String>,
}

/// What the event loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Match and title are both known
    Done,
    /// No element still to come can match
    Exhausted,
}

#[derive(Debug)]
enum Title {
    Pending,
    Reading(String),
    Settled(Option<String>),
}

/// Walk state
#[derive(Debug)]
struct Cursor {
    /// Remaining step indices, next target last
    targets: Vec<u32>,
    /// Number of targets consumed so far, equal to the depth of the next one
    consumed: usize,
    /// Last index handed out at each open level; the bottom entry is the
    /// synthetic document node
    counters: Vec<u32>,
    /// How many open ancestors follow `TITLE_CHAIN`
    title_chain: usize,
    title: Title,
    matched: Option<(String, BTreeMap<String, String>)>,
}

impl Cursor {
    fn new(steps: &[u32]) -> Self {
        let mut targets: Vec<u32> = steps.iter().rev().copied().collect();
        targets.push(ROOT_ELEMENT_INDEX);

        Self {
            targets,
            consumed: 0,
            counters: vec![0],
            title_chain: 0,
            title: Title::Pending,
            matched: None,
        }
    }

    /// Number of currently open elements
    fn depth(&self) -> usize {
        self.counters.len().saturating_sub(1)
    }

    fn enter(&mut self, element: &BytesStart<'_>) -> Result<Flow> {
        let depth = self.depth();
        let index = match self.counters.last_mut() {
            Some(counter) => {
                // next even index strictly above the last one handed out
                *counter = (*counter / 2 + 1) * 2;
                *counter
            }
            None => return Ok(Flow::Continue),
        };
        self.counters.push(0);

        self.track_title_open(depth, element.local_name().as_ref());

        if self.matched.is_none()
            && depth == self.consumed
            && self.targets.last() == Some(&index)
        {
            self.targets.pop();
            self.consumed += 1;
            trace!(depth, index, "Step matched");

            if self.targets.is_empty() {
                let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                debug!(%tag, "Resolved element");
                self.matched = Some((tag, collect_attributes(element)?));
            }
        }

        Ok(self.flow())
    }

    fn leave(&mut self) -> Flow {
        self.counters.pop();
        let depth = self.depth();

        if depth < self.title_chain {
            let title = std::mem::replace(&mut self.title, Title::Pending);
            self.title = match (depth, title) {
                (2, Title::Reading(text)) => Title::Settled(Some(text)),
                // head or html closed without a title
                (0 | 1, Title::Pending) => Title::Settled(None),
                (_, title) => title,
            };
            self.title_chain = depth;
        }

        if self.matched.is_none() && depth < self.consumed {
            return Flow::Exhausted;
        }
        self.flow()
    }

    fn text(&mut self, event: &BytesText<'_>) {
        self.count_character_data();

        if let Title::Reading(title) = &mut self.title {
            let text = event
                .unescape()
                .unwrap_or_else(|_| Cow::Owned(String::from_utf8_lossy(event).into_owned()));
            title.push_str(&text);
        }
    }

    fn cdata(&mut self, content: &[u8]) {
        self.count_character_data();

        if let Title::Reading(title) = &mut self.title {
            title.push_str(&String::from_utf8_lossy(content));
        }
    }

    /// A run of character data takes one odd index, however many events
    /// it arrives in
    fn count_character_data(&mut self) {
        if let Some(counter) = self.counters.last_mut() {
            if *counter % 2 == 0 {
                *counter += 1;
            }
        }
    }

    fn track_title_open(&mut self, depth: usize, local_name: &[u8]) {
        if !matches!(self.title, Title::Pending) {
            return;
        }
        if depth == 0 && local_name != TITLE_CHAIN[0].as_bytes() {
            // not an XHTML document
            self.title = Title::Settled(None);
            return;
        }
        if depth == self.title_chain
            && depth < TITLE_CHAIN.len()
            && local_name == TITLE_CHAIN[depth].as_bytes()
        {
            self.title_chain += 1;
            if self.title_chain == TITLE_CHAIN.len() {
                self.title = Title::Reading(String::new());
            }
        }
    }

    fn flow(&self) -> Flow {
        if self.matched.is_some() && matches!(self.title, Title::Settled(_)) {
            Flow::Done
        } else {
            Flow::Continue
        }
    }

    fn finish(self) -> Option<Resolved> {
        let title = match self.title {
            Title::Settled(title) => title,
            // document ended inside the title
            Title::Reading(text) => Some(text),
            Title::Pending => None,
        };
        self.matched.map(|(tag, attributes)| Resolved {
            tag,
            attributes,
            title,
        })
    }
}

fn collect_attributes(element: &BytesStart<'_>) -> Result<BTreeMap<String, String>> {
    let mut attributes = BTreeMap::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = match attribute.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
        };
        attributes.insert(key, value);
    }
    Ok(attributes)
}

/// Resolve `steps` (root-most first, no redirects) against an XML stream
///
/// Returns `None` when no element sits at that position. Malformed XML and
/// read failures are reported as [`CfiError::Stream`](crate::CfiError::Stream).
pub fn resolve<R: BufRead>(source: R, steps: &[u32]) -> Result<Option<Resolved>> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(false);
    reader.expand_empty_elements(true);

    debug!(?steps, "Resolving steps");

    let mut cursor = Cursor::new(steps);
    let mut buf = Vec::new();

    loop {
        let flow = match reader.read_event_into(&mut buf)? {
            Event::Start(element) => cursor.enter(&element)?,
            Event::End(_) => cursor.leave(),
            Event::Text(text) => {
                cursor.text(&text);
                Flow::Continue
            }
            Event::CData(cdata) => {
                cursor.cdata(&cdata);
                Flow::Continue
            }
            Event::Eof => break,
            _ => Flow::Continue,
        };
        buf.clear();

        match flow {
            Flow::Continue => {}
            Flow::Done => {
                debug!(position = reader.buffer_position(), "Stopping early, match and title found");
                break;
            }
            Flow::Exhausted => {
                debug!(position = reader.buffer_position(), "Stopping early, no match possible");
                return Ok(None);
            }
        }
    }

    Ok(cursor.finish())
}

/// Drop trailing character-data (odd) steps
///
/// What remains addresses the element holding the text, which is as deep as
/// resolution goes.
pub fn element_steps(steps: &[u32]) -> &[u32] {
    let end = steps
        .iter()
        .rposition(|index| index % 2 == 0)
        .map_or(0, |last| last + 1);
    &steps[..end]
}

/// Resolve `steps` against the XML file at `path`
pub fn resolve_file(path: impl AsRef<Path>, steps: &[u32]) -> Result<Option<Resolved>> {
    let file = File::open(path.as_ref())?;
    resolve(BufReader::new(file), steps)
}
