//! Open section headings.
//!
//! [§ 4.3.11 Headings and outlines](https://html.spec.whatwg.org/multipage/sections.html#headings-and-outlines)
//!
//! While scanning forward, the stack holds the chain of headings the
//! current position is nested under: an `h3` after an `h2` nests, a second
//! `h2` closes both. The stack is a value; fit requests receive one and fit
//! results hand back the updated one.

use folio_dom::NodeId;

/// A heading that is still open at the scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenHeading {
    /// Rank, 1 for `h1` through 6 for `h6`.
    pub level: u8,
    /// The heading element (or `hgroup`/`header` wrapping it).
    pub node: NodeId,
}

/// Stack of open headings, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingStack(Vec<OpenHeading>);

impl HeadingStack {
    /// An empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// The stack after passing a heading of `level`: headings of the same or
    /// a lower rank are closed, then the new one opens.
    #[must_use]
    pub fn open(&self, level: u8, node: NodeId) -> Self {
        let mut headings: Vec<OpenHeading> = self
            .0
            .iter()
            .copied()
            .take_while(|h| h.level < level)
            .collect();
        headings.push(OpenHeading { level, node });
        Self(headings)
    }

    /// The most deeply nested open heading.
    #[must_use]
    pub fn innermost(&self) -> Option<&OpenHeading> {
        self.0.last()
    }

    /// Whether no heading is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of open headings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Open headings, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &OpenHeading> {
        self.0.iter()
    }
}
