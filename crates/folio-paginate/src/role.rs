//! What a node is to the fitter.

use folio_dom::{DomTree, NodeId};
use serde::Serialize;

use crate::selector::SelectorList;
use crate::style::{StyleFacts, affects_layout};

/// Classification of a container child, decided once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Takes no space in the flow; carried along but never decisive.
    Inert,
    /// A text node with visible content; splits at character offsets.
    Text,
    /// A section heading of the given rank.
    Heading(u8),
    /// May be moved past its neighbours instead of breaking the page.
    Shiftable,
    /// May be split recursively.
    Fragmentable,
    /// Moves as a whole.
    Block,
}

impl Role {
    /// Whether forward scans started for shifting must stop at this node.
    #[must_use]
    pub const fn is_shift_boundary(self) -> bool {
        matches!(self, Self::Heading(_) | Self::Shiftable)
    }
}

/// Classify `node`. Shiftable takes precedence over fragmentable.
#[must_use]
pub fn classify(
    dom: &DomTree,
    node: NodeId,
    facts: Option<&StyleFacts>,
    fragmentable: &SelectorList,
    shiftable: &SelectorList,
) -> Role {
    if !affects_layout(dom, node, facts) {
        return Role::Inert;
    }
    if dom.as_text(node).is_some() {
        return Role::Text;
    }
    if let Some(level) = heading_level(dom, node) {
        return Role::Heading(level);
    }
    if shiftable.matches(dom, node) {
        Role::Shiftable
    } else if fragmentable.matches(dom, node) {
        Role::Fragmentable
    } else {
        Role::Block
    }
}

/// [§ 4.3.6 The h1–h6 elements](https://html.spec.whatwg.org/multipage/sections.html#the-h1,-h2,-h3,-h4,-h5,-and-h6-elements)
///
/// Rank of a heading element, or of an `hgroup` or `header` whose first
/// element child is one.
fn heading_level(dom: &DomTree, node: NodeId) -> Option<u8> {
    let element = dom.as_element(node)?;
    if let Some(level) = element.heading_level() {
        return Some(level);
    }
    if !matches!(element.tag_name.as_str(), "hgroup" | "header") {
        return None;
    }
    dom.children(node)
        .iter()
        .find_map(|&child| dom.as_element(child))
        .and_then(folio_dom::ElementData::heading_level)
}
