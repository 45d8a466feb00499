//! Ordered node collections with lazily measured prefix heights.
//!
//! A [`NodeSequence`] holds consecutive siblings the fitter has committed to
//! a page. Entries are *strong* (content that justifies the page) or *weak*
//! (inert nodes and nodes that must not end a page). Trailing weak entries
//! are trimmed before a page is materialized, so a weak node only survives
//! when something strong follows it.

use folio_dom::NodeId;

use crate::error::LayoutError;

/// Measures a span of consecutive siblings.
pub trait SpanMeasure {
    /// Height of the span from `first` through `last`.
    ///
    /// # Errors
    ///
    /// Propagates the layout collaborator's failure.
    fn span_height(&mut self, first: NodeId, last: NodeId) -> Result<f32, LayoutError>;
}

impl<F> SpanMeasure for F
where
    F: FnMut(NodeId, NodeId) -> Result<f32, LayoutError>,
{
    fn span_height(&mut self, first: NodeId, last: NodeId) -> Result<f32, LayoutError> {
        self(first, last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    node: NodeId,
    weak: bool,
    /// Height of the prefix ending at this entry, once measured.
    height: Option<f32>,
}

/// Strong and weak nodes in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSequence {
    entries: Vec<Entry>,
    length_strong: usize,
}

impl NodeSequence {
    /// An empty sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            length_strong: 0,
        }
    }

    /// Append content that justifies the page.
    pub fn push_strong(&mut self, node: NodeId) {
        self.length_strong += 1;
        self.entries.push(Entry {
            node,
            weak: false,
            height: None,
        });
    }

    /// Append a node that rides along but never ends a page.
    pub fn push_weak(&mut self, node: NodeId) {
        self.entries.push(Entry {
            node,
            weak: true,
            height: None,
        });
    }

    /// Remove the last entry. Other cached heights stay valid.
    pub fn pop(&mut self) -> Option<NodeId> {
        let entry = self.entries.pop()?;
        if !entry.weak {
            self.length_strong -= 1;
        }
        Some(entry.node)
    }

    /// Remove the trailing run of weak entries, returning them last first.
    pub fn pop_weak(&mut self) -> Vec<NodeId> {
        let mut popped = Vec::new();
        while self.entries.last().is_some_and(|e| e.weak) {
            if let Some(entry) = self.entries.pop() {
                popped.push(entry.node);
            }
        }
        popped
    }

    /// Turn the last entry weak. Returns whether it was strong.
    pub fn demote_last(&mut self) -> bool {
        match self.entries.last_mut() {
            Some(entry) if !entry.weak => {
                entry.weak = true;
                self.length_strong -= 1;
                true
            }
            _ => false,
        }
    }

    /// Keep only the first `len` entries.
    pub fn truncate(&mut self, len: usize) {
        for entry in self.entries.drain(len.min(self.entries.len())..) {
            if !entry.weak {
                self.length_strong -= 1;
            }
        }
    }

    /// Move all entries of `other` to the end, keeping their strength.
    ///
    /// Their cached heights were relative to `other`'s first node and are
    /// dropped.
    pub fn append(&mut self, other: Self) {
        self.length_strong += other.length_strong;
        self.entries
            .extend(other.entries.into_iter().map(|e| Entry { height: None, ..e }));
    }

    /// Drop every cached height.
    pub fn invalidate(&mut self) {
        for entry in &mut self.entries {
            entry.height = None;
        }
    }

    /// Height of the prefix ending at `index`.
    ///
    /// # Errors
    ///
    /// Propagates measurement failures.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn height_at(&mut self, index: usize, measure: &mut dyn SpanMeasure) -> Result<f32, LayoutError> {
        if let Some(height) = self.entries[index].height {
            return Ok(height);
        }
        let height = measure.span_height(self.entries[0].node, self.entries[index].node)?;
        self.entries[index].height = Some(height);
        Ok(height)
    }

    /// Height of the whole sequence; zero when empty.
    ///
    /// # Errors
    ///
    /// Propagates measurement failures.
    pub fn height(&mut self, measure: &mut dyn SpanMeasure) -> Result<f32, LayoutError> {
        match self.entries.len() {
            0 => Ok(0.0),
            len => self.height_at(len - 1, measure),
        }
    }

    /// The latest index whose prefix height is at most `max`, scanning from
    /// the tail.
    ///
    /// # Errors
    ///
    /// Propagates measurement failures.
    pub fn index_of_height(
        &mut self,
        max: f32,
        measure: &mut dyn SpanMeasure,
    ) -> Result<Option<usize>, LayoutError> {
        for index in (0..self.entries.len()).rev() {
            if self.height_at(index, measure)? <= max {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of strong entries.
    #[must_use]
    pub const fn length_strong(&self) -> usize {
        self.length_strong
    }

    /// Node at `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<NodeId> {
        self.entries.get(index).map(|e| e.node)
    }

    /// Whether the entry at `index` is weak.
    #[must_use]
    pub fn is_weak(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.weak)
    }

    /// First node.
    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        self.entries.first().map(|e| e.node)
    }

    /// Last node.
    #[must_use]
    pub fn last(&self) -> Option<NodeId> {
        self.entries.last().map(|e| e.node)
    }

    /// Last strong node.
    #[must_use]
    pub fn last_strong(&self) -> Option<NodeId> {
        self.entries.iter().rev().find(|e| !e.weak).map(|e| e.node)
    }

    /// All nodes in order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|e| e.node)
    }

    /// All nodes in order, collected.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().collect()
    }
}
