//! Structural operations: insert, remove, move and set properties.
//!
//! Each operation either completes and leaves the tree normalized, or fails
//! and leaves it exactly as it was.

use super::{Document, EditError, normalize_node};
use crate::core::path::{is_ancestor, move_target};
use crate::core::{BlockType, ElementKind, Node, NodeId, Path};
use serde_json::{Map, Value};

const PROTECTED_PROPERTIES: [&str; 3] = ["id", "type", "children"];

impl Document {
    pub fn insert_node(&mut self, node: Node, at: &[usize]) -> Result<(), EditError> {
        self.try_insert(node, at).map_err(|(err, _)| err)?;
        self.normalize();
        Ok(())
    }

    /// Removes the node at `at` and returns it. Removing the last top-level
    /// node leaves a fresh empty paragraph behind.
    pub fn remove_node(&mut self, at: &[usize]) -> Result<Node, EditError> {
        let (&index, parent) = at
            .split_last()
            .ok_or_else(|| EditError::InvalidPath(at.to_vec()))?;
        let children = self
            .children_mut(parent)
            .filter(|children| index < children.len())
            .ok_or_else(|| EditError::InvalidPath(at.to_vec()))?;
        let removed = children.remove(index);
        self.normalize();
        Ok(removed)
    }

    /// Moves the node at `from` so that it ends up at `to`, keeping its
    /// subtree intact. Ancestors in `to` are given in pre-move coordinates.
    /// Returns the path the node occupies afterwards.
    pub fn move_node(&mut self, from: &[usize], to: &[usize]) -> Result<Path, EditError> {
        if self.node(from).is_none() {
            return Err(EditError::InvalidPath(from.to_vec()));
        }
        if from == to {
            return Ok(to.to_vec());
        }
        if to.is_empty() || is_ancestor(from, to) {
            return Err(EditError::InvalidPath(to.to_vec()));
        }

        let target = move_target(from, to);
        let (&index, parent) = from
            .split_last()
            .ok_or_else(|| EditError::InvalidPath(from.to_vec()))?;
        let node = self
            .children_mut(parent)
            .ok_or_else(|| EditError::InvalidPath(from.to_vec()))?
            .remove(index);

        match self.try_insert(node, &target) {
            Ok(()) => {
                self.normalize();
                Ok(target)
            }
            Err((err, node)) => {
                if let Some(children) = self.children_mut(parent) {
                    children.insert(index, node);
                }
                Err(err)
            }
        }
    }

    /// Shallow-merges `properties` into the element's attributes. A `null`
    /// value unsets the attribute. `id`, `type` and `children` are rejected.
    pub fn set_node_properties(
        &mut self,
        at: &[usize],
        properties: &Map<String, Value>,
    ) -> Result<(), EditError> {
        if let Some(key) = PROTECTED_PROPERTIES
            .iter()
            .find(|key| properties.contains_key(**key))
        {
            return Err(EditError::ProtectedProperty((*key).to_string()));
        }

        let element = self.element_mut(at)?;
        let (tag, mut attrs) = element.kind.to_parts();
        for (key, value) in properties {
            if value.is_null() {
                attrs.remove(key);
            } else {
                attrs.insert(key.clone(), value.clone());
            }
        }
        element.kind = ElementKind::from_parts(&tag, attrs)
            .map_err(|err| EditError::InvalidProperties(err.to_string()))?;
        Ok(())
    }

    /// Converts the element at `at` to another built-in type.
    pub fn set_block_type(&mut self, at: &[usize], block_type: BlockType) -> Result<(), EditError> {
        let kind = self.element(at)?.kind.converted(block_type);
        self.set_kind(at, kind)
    }

    /// Replaces the element's kind wholesale, keeping its id and children.
    pub fn set_kind(&mut self, at: &[usize], kind: ElementKind) -> Result<(), EditError> {
        if at.len() == 1 && kind.is_inline() {
            return Err(EditError::InlineAtTopLevel);
        }
        let node = self
            .node_mut(at)
            .ok_or_else(|| EditError::InvalidPath(at.to_vec()))?;
        let element = node
            .as_element_mut()
            .ok_or_else(|| EditError::NotAnElement(at.to_vec()))?;
        element.kind = kind;
        normalize_node(node);
        Ok(())
    }

    /// Gives an id to an element that has none. Existing ids are never
    /// replaced.
    pub(crate) fn assign_id(&mut self, at: &[usize], id: NodeId) -> Result<bool, EditError> {
        let element = self.element_mut(at)?;
        if element.id.is_some() {
            return Ok(false);
        }
        element.id = Some(id);
        Ok(true)
    }

    /// Paths of elements without an id, parents before children.
    pub(crate) fn paths_missing_id(&self) -> Vec<Path> {
        fn walk(nodes: &[Node], prefix: &mut Path, out: &mut Vec<Path>) {
            for (index, node) in nodes.iter().enumerate() {
                let Node::Element(element) = node else {
                    continue;
                };
                prefix.push(index);
                if element.id.is_none() {
                    out.push(prefix.clone());
                }
                walk(&element.children, prefix, out);
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        walk(self.nodes(), &mut Vec::new(), &mut out);
        out
    }

    /// Inserts without normalizing, handing the node back on failure.
    fn try_insert(&mut self, mut node: Node, at: &[usize]) -> Result<(), (EditError, Node)> {
        let Some((&index, parent)) = at.split_last() else {
            return Err((EditError::InvalidPath(at.to_vec()), node));
        };
        if parent.is_empty() && !node.is_block() {
            return Err((EditError::InlineAtTopLevel, node));
        }
        if !parent.is_empty() {
            match self.element(parent) {
                Ok(element) if element.is_void() => {
                    return Err((EditError::VoidElement(parent.to_vec()), node));
                }
                Ok(element) if element.is_inline() && node.is_block() => {
                    return Err((EditError::InvalidPath(at.to_vec()), node));
                }
                Ok(_) => {}
                Err(err) => return Err((err, node)),
            }
        }
        let Some(children) = self.children_mut(parent) else {
            return Err((EditError::InvalidPath(at.to_vec()), node));
        };
        if index > children.len() {
            return Err((EditError::InvalidPath(at.to_vec()), node));
        }
        normalize_node(&mut node);
        children.insert(index, node);
        Ok(())
    }
}
