//! Height measurement.
//!
//! The fitter never lays anything out itself. It asks a [`LayoutEngine`]
//! for the block-axis extent of single nodes and of sibling spans, and
//! remembers the answers in a [`Measurer`] until the tree changes.
//!
//! [`BlockFlow`] is the built-in engine: a deterministic vertical block
//! flow with fixed-width text lines, enough to paginate documents without a
//! browser and to test pagination exactly.

use std::collections::HashMap;

use folio_dom::{DomTree, NodeId, NodeType};

use crate::error::LayoutError;
use crate::style::{BoxSizing, InlineStyles, StyleFacts, StyleSource, TextWrap};

/// Characters that fit on one line of [`BlockFlow`] text unless configured.
pub const DEFAULT_CHARS_PER_LINE: usize = 60;

/// A run of consecutive siblings, from `first` through `last`.
///
/// [§ 5.2 Ranges](https://dom.spec.whatwg.org/#concept-range)
///
/// With `end_offset`, `last` must be a text node and only its first
/// `end_offset` characters belong to the span, like a range whose end
/// boundary point is `(last, end_offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// First node of the span.
    pub first: NodeId,
    /// Last node of the span; a following sibling of `first` or `first` itself.
    pub last: NodeId,
    /// Character offset into `last`, if the span ends inside it.
    pub end_offset: Option<usize>,
}

impl Span {
    /// The span of whole nodes from `first` through `last`.
    #[must_use]
    pub const fn new(first: NodeId, last: NodeId) -> Self {
        Self {
            first,
            last,
            end_offset: None,
        }
    }

    /// The span ending `offset` characters into the text node `last`.
    #[must_use]
    pub const fn ending_in_text(first: NodeId, last: NodeId, offset: usize) -> Self {
        Self {
            first,
            last,
            end_offset: Some(offset),
        }
    }
}

/// The measurement collaborator.
///
/// Heights are in the same units as the page budget and must reflect the
/// current state of the tree.
pub trait LayoutEngine {
    /// Block-axis extent of `node`, margins included.
    ///
    /// # Errors
    ///
    /// Fails when the node cannot be measured.
    fn node_height(&self, dom: &DomTree, node: NodeId) -> Result<f32, LayoutError>;

    /// Block-axis extent of a sibling span.
    ///
    /// # Errors
    ///
    /// Fails when the span is broken or one of its nodes cannot be measured.
    fn span_height(&self, dom: &DomTree, span: Span) -> Result<f32, LayoutError>;

    /// Inline-axis extent of `node`, used to derive the page height from the
    /// aspect ratio.
    ///
    /// # Errors
    ///
    /// Fails when the node cannot be measured.
    fn inline_size(&self, dom: &DomTree, node: NodeId) -> Result<f32, LayoutError>;
}

/// Vertical block flow with fixed-width text.
///
/// - Every in-flow child of an element starts on a new line; children stack
///   without margin collapsing.
/// - Text wraps after `chars_per_line` characters of collapsed white space
///   and takes its parent's line height per line. `nowrap` text breaks only
///   at newlines. `balance` and `pretty` text wraps at the balanced line
///   length of the whole text node, so a measured prefix may need more
///   lines than the same characters wrapped greedily.
/// - An explicit `height` makes a box atomic.
/// - A loaded replaced element (`data-loaded`) with `data-loaded-height`
///   takes that content height.
#[derive(Debug, Clone)]
pub struct BlockFlow {
    /// Inline size of every block.
    pub width: f32,
    /// Characters per line of wrapped text.
    pub chars_per_line: usize,
    styles: InlineStyles,
}

impl BlockFlow {
    /// A flow `width` pixels wide with the default line length.
    #[must_use]
    pub const fn new(width: f32) -> Self {
        Self {
            width,
            chars_per_line: DEFAULT_CHARS_PER_LINE,
            styles: InlineStyles::new(),
        }
    }

    /// Override the number of characters per line.
    #[must_use]
    pub const fn with_chars_per_line(mut self, chars_per_line: usize) -> Self {
        self.chars_per_line = if chars_per_line == 0 { 1 } else { chars_per_line };
        self
    }

    fn parent_facts(&self, dom: &DomTree, node: NodeId) -> StyleFacts {
        dom.parent(node)
            .and_then(|parent| self.styles.computed(dom, parent))
            .unwrap_or_default()
    }

    fn outer_height(&self, dom: &DomTree, node: NodeId) -> Result<f32, LayoutError> {
        let data = &dom.get(node).ok_or(LayoutError::UnknownNode(node))?.node_type;
        let height = match data {
            NodeType::Text(text) => {
                let facts = self.parent_facts(dom, node);
                self.text_height(text, text.chars().count(), &facts)
            }
            NodeType::Element(_) => match self.styles.computed(dom, node) {
                Some(facts) if facts.in_flow() => self.box_height(dom, node, &facts)? + facts.margin_block(),
                _ => 0.0,
            },
            NodeType::Document | NodeType::Comment(_) => 0.0,
        };
        if height.is_finite() {
            Ok(height)
        } else {
            Err(LayoutError::NonFinite { node, height })
        }
    }

    fn box_height(&self, dom: &DomTree, node: NodeId, facts: &StyleFacts) -> Result<f32, LayoutError> {
        let edges = facts.padding_block() + facts.border_block();
        let loaded = dom
            .attr(node, "data-loaded")
            .and(dom.attr(node, "data-loaded-height"))
            .and_then(|h| h.trim().parse::<f32>().ok());

        let content = match (loaded, facts.height) {
            (Some(height), _) => height,
            (None, Some(height)) => {
                return Ok(match facts.box_sizing {
                    BoxSizing::BorderBox => height.max(edges),
                    BoxSizing::ContentBox => height + edges,
                }
                .max(facts.outer_height(facts.min_height)));
            }
            (None, None) => {
                let mut sum = 0.0;
                for &child in dom.children(node) {
                    sum += self.outer_height(dom, child)?;
                }
                sum
            }
        };
        Ok((content + edges).max(facts.outer_height(facts.min_height)))
    }

    /// Height of the first `prefix` characters of `text` laid out as a
    /// whole text node.
    fn text_height(&self, text: &str, prefix: usize, facts: &StyleFacts) -> f32 {
        let head: String = text.chars().take(prefix).collect();
        if head.trim().is_empty() {
            return 0.0;
        }
        let lines = match facts.text_wrap {
            TextWrap::Nowrap => head.trim_matches('\n').lines().count(),
            wrap => {
                let used = collapsed_len(&head);
                let line = if wrap.is_whole_block() {
                    balanced_line_length(collapsed_len(text), self.chars_per_line)
                } else {
                    self.chars_per_line
                };
                used.div_ceil(line)
            }
        };
        lines as f32 * facts.line_height
    }
}

impl LayoutEngine for BlockFlow {
    fn node_height(&self, dom: &DomTree, node: NodeId) -> Result<f32, LayoutError> {
        self.outer_height(dom, node)
    }

    fn span_height(&self, dom: &DomTree, span: Span) -> Result<f32, LayoutError> {
        let mut total = 0.0;
        let mut current = Some(span.first);
        while let Some(node) = current {
            if node == span.last {
                total += match (span.end_offset, dom.as_text(node)) {
                    (Some(offset), Some(text)) => {
                        let facts = self.parent_facts(dom, node);
                        self.text_height(text, offset, &facts)
                    }
                    _ => self.outer_height(dom, node)?,
                };
                return Ok(total);
            }
            total += self.outer_height(dom, node)?;
            current = dom.next_sibling(node);
        }
        if dom.get(span.first).is_none() {
            return Err(LayoutError::UnknownNode(span.first));
        }
        Err(LayoutError::BrokenSpan {
            first: span.first,
            last: span.last,
        })
    }

    fn inline_size(&self, dom: &DomTree, node: NodeId) -> Result<f32, LayoutError> {
        if dom.get(node).is_none() {
            return Err(LayoutError::UnknownNode(node));
        }
        Ok(self.width)
    }
}

/// [§ 4.1.1 Phase I: Collapsing and Transformation](https://www.w3.org/TR/css-text-3/#white-space-phase-1)
///
/// Length of `text` in characters once white space runs collapse to one
/// space and leading and trailing white space is removed.
fn collapsed_len(text: &str) -> usize {
    let mut len = 0;
    for (i, word) in text.split_whitespace().enumerate() {
        len += word.chars().count() + usize::from(i > 0);
    }
    len
}

/// Line length that spreads `total` characters evenly over the minimum
/// number of lines.
fn balanced_line_length(total: usize, chars_per_line: usize) -> usize {
    let lines = total.div_ceil(chars_per_line).max(1);
    total.div_ceil(lines).max(1)
}

/// Generation stamp of a cached height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    revision: u64,
    epoch: u64,
}

/// Memo of node heights.
///
/// An entry is valid while both the tree revision and the measurer's own
/// epoch are unchanged. The epoch bumps on [`Measurer::invalidate_all`],
/// which callers use after anything outside the tree (a resource load) may
/// have changed layout.
#[derive(Debug, Default)]
pub struct Measurer {
    heights: HashMap<NodeId, (Generation, f32)>,
    epoch: u64,
}

impl Measurer {
    /// Create an empty measurer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of `node`; `force` skips the cache.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, and rejects non-finite heights.
    pub fn node_height(
        &mut self,
        layout: &dyn LayoutEngine,
        dom: &DomTree,
        node: NodeId,
        force: bool,
    ) -> Result<f32, LayoutError> {
        let generation = Generation {
            revision: dom.revision(),
            epoch: self.epoch,
        };
        if !force {
            if let Some(&(cached, height)) = self.heights.get(&node) {
                if cached == generation {
                    return Ok(height);
                }
            }
        }
        let height = layout.node_height(dom, node)?;
        if !height.is_finite() {
            return Err(LayoutError::NonFinite { node, height });
        }
        let _ = self.heights.insert(node, (generation, height));
        Ok(height)
    }

    /// Forget every cached height.
    pub fn invalidate_all(&mut self) {
        self.epoch += 1;
        self.heights.clear();
    }
}
