//! Loading documents from a JSON description.
//!
//! ```json
//! { "tag": "section", "attrs": { "class": "page" }, "children": [
//!     { "tag": "h2", "children": [{ "text": "Intro" }] },
//!     { "comment": "draft" }
//! ] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DomError, DomTree, ElementData, NodeId, NodeType};

/// One node of a JSON document description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    /// A text run.
    Text {
        /// Character data.
        text: String,
    },
    /// A comment.
    Comment {
        /// Comment data.
        comment: String,
    },
    /// An element with attributes and children.
    Element {
        /// Tag name, case-insensitive.
        tag: String,
        /// Attributes.
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        /// Child nodes in document order.
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
}

impl DomTree {
    /// Build a tree whose document node holds the described nodes.
    ///
    /// Accepts either a single node or an array of nodes.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Malformed`] when the JSON does not describe nodes.
    pub fn from_json(source: &str) -> Result<Self, DomError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Top {
            Many(Vec<NodeSpec>),
            One(NodeSpec),
        }

        let top: Top =
            serde_json::from_str(source).map_err(|e| DomError::Malformed(e.to_string()))?;
        let specs = match top {
            Top::Many(specs) => specs,
            Top::One(spec) => vec![spec],
        };

        let mut tree = Self::new();
        for spec in &specs {
            let _ = tree.build(NodeId::ROOT, spec);
        }
        Ok(tree)
    }

    /// Allocate the nodes described by `spec` and append them to `parent`.
    pub fn build(&mut self, parent: NodeId, spec: &NodeSpec) -> NodeId {
        let id = match spec {
            NodeSpec::Text { text } => self.alloc(NodeType::Text(text.clone())),
            NodeSpec::Comment { comment } => self.alloc(NodeType::Comment(comment.clone())),
            NodeSpec::Element {
                tag,
                attrs,
                children,
            } => {
                let mut data = ElementData::new(tag);
                data.attrs
                    .extend(attrs.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())));
                let id = self.alloc(NodeType::Element(data));
                for child in children {
                    let _ = self.build(id, child);
                }
                id
            }
        };
        self.append_child(parent, id);
        id
    }
}
