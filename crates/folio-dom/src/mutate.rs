//! Tree mutation primitives.
//!
//! [§ 4.2.3 Mutation algorithms](https://dom.spec.whatwg.org/#mutation-algorithms)
//!
//! Insertion follows the DOM rule that a node already in the tree is first
//! removed from its old parent. Every method here bumps the tree revision.

use crate::{DomError, DomTree, ElementData, NodeId, NodeType, PaginationState};

impl DomTree {
    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// "To append a node to a parent, pre-insert node into parent before null."
    ///
    /// Appends `child` as the last child of `parent`, updating all relationships.
    ///
    /// # Panics
    ///
    /// Panics if either id does not belong to this tree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes[child.0].parent.is_some() {
            let _ = self.detach(child);
        }

        // Get the current last child of parent (if any) to set up sibling links
        let prev_last_child = self.nodes[parent.0].children.last().copied();

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].next_sibling = None;
        self.nodes[child.0].prev_sibling = prev_last_child;

        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.0].next_sibling = Some(child);
        }
        self.touch();
    }

    /// [§ 4.2.3 Remove](https://dom.spec.whatwg.org/#concept-node-remove)
    ///
    /// Removes `node` from its parent, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for ids outside the arena.
    pub fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(());
        };
        self.remove_child(parent, node)
    }

    /// Removes `child` from `parent`'s children.
    ///
    /// # Errors
    ///
    /// Fails if `child` is not currently a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let position = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild { parent, child })?;

        let _ = self.node_mut(parent)?.children.remove(position);
        let removed = self.node_mut(child)?;
        removed.parent = None;
        removed.prev_sibling = None;
        removed.next_sibling = None;
        self.relink(parent);
        self.touch();
        Ok(())
    }

    /// [§ 4.2.3 Pre-insert](https://dom.spec.whatwg.org/#concept-node-pre-insert)
    ///
    /// Inserts `new_child` into `parent` immediately before `reference`.
    ///
    /// # Errors
    ///
    /// Fails if `reference` is not a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.insert_relative(parent, new_child, reference, 0)
    }

    /// Inserts `new_child` into `parent` immediately after `reference`.
    ///
    /// # Errors
    ///
    /// Fails if `reference` is not a child of `parent`.
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.insert_relative(parent, new_child, reference, 1)
    }

    /// Inserts `new_child` as the first child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for ids outside the arena.
    pub fn prepend_child(&mut self, parent: NodeId, new_child: NodeId) -> Result<(), DomError> {
        match self.first_child(parent) {
            Some(first) if first != new_child => self.insert_before(parent, new_child, first),
            Some(_) => Ok(()),
            None => {
                let _ = self.node(parent)?;
                self.detach(new_child)?;
                self.append_child(parent, new_child);
                Ok(())
            }
        }
    }

    fn insert_relative(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        reference: NodeId,
        offset: usize,
    ) -> Result<(), DomError> {
        if new_child == reference {
            return Ok(());
        }
        self.detach(new_child)?;
        let position = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::NotAChild {
                parent,
                child: reference,
            })?;

        self.node_mut(parent)?
            .children
            .insert(position + offset, new_child);
        self.node_mut(new_child)?.parent = Some(parent);
        self.relink(parent);
        self.touch();
        Ok(())
    }

    /// Moves every child of `from` to the end of `to`, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for ids outside the arena.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<(), DomError> {
        let moved = std::mem::take(&mut self.node_mut(from)?.children);
        let _ = self.node(to)?;
        for child in moved {
            self.node_mut(child)?.parent = None;
            self.append_child(to, child);
        }
        Ok(())
    }

    /// [§ 4.4 Clone a node](https://dom.spec.whatwg.org/#concept-node-clone)
    ///
    /// Copies the node's type, tag and attributes but none of its children
    /// or pagination state. The clone is detached.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for ids outside the arena.
    pub fn clone_shallow(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let node_type = self.node(id)?.node_type.clone();
        Ok(self.alloc(node_type))
    }

    /// Clones `id` together with its whole subtree. The clone is detached.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for ids outside the arena.
    pub fn clone_deep(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let copy = self.clone_shallow(id)?;
        let children = self.node(id)?.children.clone();
        for child in children {
            let child_copy = self.clone_deep(child)?;
            self.append_child(copy, child_copy);
        }
        Ok(copy)
    }

    /// [§ 4.11 splitText](https://dom.spec.whatwg.org/#dom-text-splittext)
    ///
    /// "Splits data at the given offset and returns the remainder as a Text node."
    ///
    /// `offset` counts characters. The remainder is inserted after `id` when
    /// `id` has a parent.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not a text node or `offset` is past its end.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let NodeType::Text(data) = &self.node(id)?.node_type else {
            return Err(DomError::NotText(id));
        };
        let len = data.chars().count();
        if offset > len {
            return Err(DomError::OffsetOutOfRange { offset, len });
        }
        let byte = data
            .char_indices()
            .nth(offset)
            .map_or(data.len(), |(b, _)| b);
        let tail = data[byte..].to_string();
        let head = data[..byte].to_string();

        self.node_mut(id)?.node_type = NodeType::Text(head);
        let remainder = self.alloc(NodeType::Text(tail));
        if let Some(parent) = self.parent(id) {
            self.insert_after(parent, remainder, id)?;
        }
        self.touch();
        Ok(remainder)
    }

    /// Replaces the data of a text node.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not a text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let node = self.node_mut(id)?;
        match &mut node.node_type {
            NodeType::Text(data) => *data = text.to_string(),
            _ => return Err(DomError::NotText(id)),
        }
        self.touch();
        Ok(())
    }

    /// Sets an attribute, returning the previous value.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not an element.
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<Option<String>, DomError> {
        let previous = self
            .element_mut(id)?
            .attrs
            .insert(name.to_string(), value.to_string());
        self.touch();
        Ok(previous)
    }

    /// Removes an attribute, returning its value.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not an element.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let previous = self.element_mut(id)?.attrs.remove(name);
        self.touch();
        Ok(previous)
    }

    /// Adds `class` to the class list if missing.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not an element.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        if !element.has_class(class) {
            let list = element.attrs.entry("class".to_string()).or_default();
            if !list.trim().is_empty() {
                list.push(' ');
            }
            list.push_str(class);
        }
        self.touch();
        Ok(())
    }

    /// Removes `class` from the class list.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not an element.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        if let Some(list) = element.attrs.get_mut("class") {
            *list = list
                .split_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
            if list.is_empty() {
                let _ = element.attrs.remove("class");
            }
        }
        self.touch();
        Ok(())
    }

    /// Mutable access to element data.
    ///
    /// # Errors
    ///
    /// Fails when `id` is not an element.
    pub fn element_data_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        self.touch();
        self.element_mut(id)
    }

    /// Mutable access to a node's pagination state.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::UnknownNode`] for ids outside the arena.
    pub fn pagination_mut(&mut self, id: NodeId) -> Result<&mut PaginationState, DomError> {
        self.touch();
        Ok(&mut self.node_mut(id)?.pagination)
    }

    /// Rebuild sibling links of `parent`'s children from its child list.
    fn relink(&mut self, parent: NodeId) {
        let children = self.nodes[parent.0].children.clone();
        for (i, &child) in children.iter().enumerate() {
            let node = &mut self.nodes[child.0];
            node.prev_sibling = i.checked_sub(1).map(|p| children[p]);
            node.next_sibling = children.get(i + 1).copied();
        }
    }
}
