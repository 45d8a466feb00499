//! DOM tree implementation for Folio.
//!
//! This crate provides an arena-based DOM tree structure following the
//! [DOM Living Standard](https://dom.spec.whatwg.org/), extended with the
//! state pagination keeps on nodes: which elements were split into
//! fragments, and how often an element has been shifted.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues. Every
//! structural or attribute mutation bumps [`DomTree::revision`], which
//! measurement caches use as their generation counter.

mod json;
mod mutate;
mod serialize;

pub use json::NodeSpec;
pub use serialize::to_html;

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

/// Map of attribute names to values for an element.
pub type AttributesMap = HashMap<String, String>;

/// Errors raised by tree operations that were handed a node they cannot act on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The id does not name a node in this tree.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// The operation requires an element.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// The operation requires a text node.
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    /// The operation requires `child` to be a child of `parent`.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Expected parent.
        parent: NodeId,
        /// Node that was not found among its children.
        child: NodeId,
    },
    /// A text offset past the end of the text.
    #[error("offset {offset} is out of range for text of length {len}")]
    OffsetOutOfRange {
        /// Requested character offset.
        offset: usize,
        /// Length of the text in characters.
        len: usize,
    },
    /// A JSON document description could not be read.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
///
/// NodeId provides O(1) access to any node in the tree without borrowing issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Node is an abstract interface that is used by all nodes in a tree."
/// "Each node has an associated node document... and parent (null or an element)."
///
/// This node stores indices for parent/child/sibling relationships,
/// enabling O(1) traversal in any direction.
#[derive(Debug, Clone)]
pub struct Node {
    /// "Each node has an associated node type"
    pub node_type: NodeType,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    /// "An object that participates in a tree has a parent, which is either
    /// null or an object."
    pub parent: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    /// "A node has an associated list of children"
    pub children: Vec<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-next-sibling)
    /// "An object A's next sibling is the object immediately following A
    /// in the children of A's parent."
    pub next_sibling: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-previous-sibling)
    /// "An object A's previous sibling is the object immediately preceding A
    /// in the children of A's parent."
    pub prev_sibling: Option<NodeId>,

    /// Pagination state that outlives a single pass.
    pub pagination: PaginationState,
}

impl Node {
    fn detached(node_type: NodeType) -> Self {
        Self {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
            pagination: PaginationState::default(),
        }
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
    /// "A document whose type is "html" is known as an HTML document."
    Document,
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    /// "Element nodes are simply known as elements."
    Element(ElementData),
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    /// "Text nodes are known as text."
    Text(String),
    /// [§ 4.7 Interface Comment](https://dom.spec.whatwg.org/#interface-comment)
    /// "Comment nodes are known as comments."
    Comment(String),
}

/// Element-specific data.
///
/// Per [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element):
/// - "Elements have an associated namespace, namespace prefix, local name, custom element state,
///    custom element definition, is value."
/// - "When an element is created, its local name is always given."
///
/// NOTE: We only store tag_name (local name) and attrs for simplicity.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// "An element's local name"
    pub tag_name: String,
    /// "An element has an associated attribute list"
    pub attrs: AttributesMap,
}

impl ElementData {
    /// Create element data for `tag` with no attributes.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag_name: tag.to_ascii_lowercase(),
            attrs: AttributesMap::new(),
        }
    }

    /// Returns the element's id attribute value if present.
    ///
    /// Per [§ 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes):
    /// "The id attribute specifies its element's unique identifier (ID)."
    #[must_use]
    pub fn id(&self) -> Option<&String> {
        self.attrs.get("id")
    }

    /// Whether the class attribute contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attrs
            .get("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class))
    }

    /// Whether the element is one of the section headings `h1`–`h6`,
    /// returning its level.
    #[must_use]
    pub fn heading_level(&self) -> Option<u8> {
        match self.tag_name.as_str() {
            "h1" => Some(1),
            "h2" => Some(2),
            "h3" => Some(3),
            "h4" => Some(4),
            "h5" => Some(5),
            "h6" => Some(6),
            _ => None,
        }
    }
}

/// State an element accumulates while being paginated.
///
/// Fragment links are created on the first split and only ever grow; they
/// are the permanent record of how one logical element maps onto pages.
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Fragments split off this element, in document order.
    pub fragments: Vec<NodeId>,
    /// The element this one was split off from.
    pub fragmented_from: Option<NodeId>,
    /// The id the element carried before its first split.
    pub source_id: Option<String>,
    /// How many times the element has been moved by shifting.
    pub times_shifted: u32,
}

impl PaginationState {
    /// Whether the element has been split at least once.
    #[must_use]
    pub fn is_fragmented(&self) -> bool {
        !self.fragments.is_empty()
    }
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
///
/// "The DOM represents a document as a tree. A tree is a finite hierarchical
/// tree structure."
///
/// This structure stores all nodes in a contiguous vector, using indices
/// for all relationships. Nodes are never freed; removed nodes simply become
/// detached.
#[derive(Debug, Clone)]
pub struct DomTree {
    /// All nodes in the tree, indexed by NodeId.
    /// The Document node is always at index 0 (NodeId::ROOT).
    nodes: Vec<Node>,

    /// Bumped by every mutation.
    revision: u64,
}

impl DomTree {
    /// Create a new DOM tree with just the Document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::detached(NodeType::Document)],
            revision: 0,
        }
    }

    /// Get the root document node ID.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Current mutation counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by its ID.
    ///
    /// Changes made through this reference are not tracked by
    /// [`DomTree::revision`]; prefer the mutation methods.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Get the number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should always have at least the Document).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::detached(node_type));
        id
    }

    /// Allocate a detached element with the given tag.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeType::Element(ElementData::new(tag)))
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeType::Text(text.to_string()))
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Get the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// Get the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Position of `id` among its parent's children.
    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// [§ 4.2.6 Descendant](https://dom.spec.whatwg.org/#concept-tree-descendant)
    ///
    /// "An object A is called a descendant of an object B, if either A is a
    /// child of B or A is a child of an object C that is a descendant of B."
    ///
    /// Check if `descendant` is a descendant of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// Iterate over all ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Iterate over `id` and all of its descendants in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    /// [§ 4.2.6 Closest](https://dom.spec.whatwg.org/#dom-element-closest)
    ///
    /// The first of `id` and its ancestors that satisfies `predicate`.
    pub fn closest(&self, id: NodeId, mut predicate: impl FnMut(NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| predicate(n))
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Whether the node is a comment.
    #[must_use]
    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.get(id).map(|n| &n.node_type), Some(NodeType::Comment(_)))
    }

    /// Tag name of an element, lowercased at creation.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.as_element(id).map(|e| e.tag_name.as_str())
    }

    /// Attribute value of an element.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.as_element(id)
            .and_then(|e| e.attrs.get(name))
            .map(String::as_str)
    }

    /// Whether an element carries `class`.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.as_element(id).is_some_and(|e| e.has_class(class))
    }

    /// [§ 4.4 textContent](https://dom.spec.whatwg.org/#dom-node-textcontent)
    ///
    /// "The concatenation of data of all the Text node descendants."
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|n| self.as_text(n))
            .collect()
    }

    /// [§ 4.5 getElementById](https://dom.spec.whatwg.org/#dom-nonelementparentnode-getelementbyid)
    ///
    /// "The first element, in tree order, within this's descendants, whose ID is elementId."
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(NodeId::ROOT)
            .find(|&n| self.as_element(n).and_then(ElementData::id).is_some_and(|v| v == id))
    }

    /// Pagination state of a node.
    #[must_use]
    pub fn pagination(&self, id: NodeId) -> Option<&PaginationState> {
        self.get(id).map(|n| &n.pagination)
    }

    /// [§ 3.1.1 The document element](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    ///
    /// "The document element of a document is the element whose parent is that
    /// document, if it exists; otherwise null."
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| self.as_element(id).is_some())
            .copied()
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.node_type {
            NodeType::Element(data) => Ok(data),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over ancestors of a node.
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
