//! Text-level operations and block splitting/merging.

use super::{Document, EditError};
use crate::core::path::{is_ancestor, parent, transform_remove};
use crate::core::{Element, MarkSet, Node, Path, Point};

impl Document {
    /// Inserts `text` at `point` and returns the caret offset after it.
    pub fn insert_text(&mut self, point: &Point, text: &str) -> Result<usize, EditError> {
        self.ensure_editable(&point.path)?;
        let leaf = self.leaf_mut(&point.path)?;
        leaf.insert(point.offset, text).ok_or_else(|| EditError::InvalidOffset {
            path: point.path.clone(),
            offset: point.offset,
        })
    }

    /// Removes the graphemes `start..end` of the leaf at `path`.
    pub fn remove_text(&mut self, path: &[usize], start: usize, end: usize) -> Result<String, EditError> {
        let leaf = self.leaf_mut(path)?;
        leaf.remove(start, end).ok_or_else(|| EditError::InvalidOffset {
            path: path.to_vec(),
            offset: end,
        })
    }

    /// Splits the leaf at `path` in two; the tail becomes the next sibling.
    pub fn split_leaf(&mut self, path: &[usize], offset: usize) -> Result<(), EditError> {
        let tail = self.leaf_mut(path)?.split_off(offset).ok_or_else(|| EditError::InvalidOffset {
            path: path.to_vec(),
            offset,
        })?;
        let (&index, parent_path) = path
            .split_last()
            .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?;
        let siblings = self
            .children_mut(parent_path)
            .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?;
        siblings.insert(index + 1, Node::Text(tail));
        Ok(())
    }

    pub fn set_leaf_marks(&mut self, path: &[usize], marks: MarkSet) -> Result<(), EditError> {
        self.leaf_mut(path)?.marks = marks;
        Ok(())
    }

    /// Splits `block` at `point`. Everything after the point moves into a new
    /// sibling of the same kind, without an id, whose path is returned.
    pub fn split_block(&mut self, point: &Point, block: &[usize]) -> Result<Path, EditError> {
        if !is_ancestor(block, &point.path) {
            return Err(EditError::InvalidPath(block.to_vec()));
        }
        if !self.is_valid_point(point) {
            return Err(EditError::InvalidOffset {
                path: point.path.clone(),
                offset: point.offset,
            });
        }
        let element = self.element_mut(block)?;
        if element.is_void() {
            return Err(EditError::VoidElement(block.to_vec()));
        }
        let kind = element.kind.clone();
        let tail = split_children(&mut element.children, &point.path[block.len()..], point.offset);

        let (&index, parent_path) = block
            .split_last()
            .ok_or_else(|| EditError::InvalidPath(block.to_vec()))?;
        let siblings = self
            .children_mut(parent_path)
            .ok_or_else(|| EditError::InvalidPath(block.to_vec()))?;
        siblings.insert(
            index + 1,
            Node::Element(Element {
                id: None,
                kind,
                children: tail,
            }),
        );
        self.normalize();

        let mut new_path = block.to_vec();
        if let Some(last) = new_path.last_mut() {
            *last += 1;
        }
        Ok(new_path)
    }

    /// Merges `block` into the block that precedes it in document order and
    /// returns the join point. A preceding void block is removed instead.
    pub fn merge_block(&mut self, block: &[usize]) -> Result<Point, EditError> {
        let current = self.element(block)?;
        let current_void = current.is_void();
        let previous_leaf = self.previous_leaf(block);

        let Some(previous_leaf) = previous_leaf else {
            if current_void {
                self.remove_node(block)?;
                return Ok(self.nearest_point(block, 0));
            }
            return Err(EditError::InvalidPath(block.to_vec()));
        };
        let target = self
            .block_above(&previous_leaf)
            .ok_or_else(|| EditError::InvalidPath(previous_leaf.clone()))?;
        if is_ancestor(&target, block) {
            return Err(EditError::InvalidPath(block.to_vec()));
        }

        if self.element(&target)?.is_void() && !current_void {
            self.remove_node(&target)?;
            let moved = transform_remove(block, &target).unwrap_or_else(|| block.to_vec());
            return self
                .start_point(&moved)
                .ok_or(EditError::InvalidPath(moved));
        }

        let join = self
            .end_point(&target)
            .ok_or_else(|| EditError::InvalidPath(target.clone()))?;
        let removed = self.take_block(block)?;
        if !current_void && let Node::Element(element) = removed {
            self.element_mut(&target)?.children.extend(element.children);
        }
        self.normalize();
        Ok(join)
    }

    /// Path of the leaf right before the first leaf of `block`.
    pub(crate) fn previous_leaf(&self, block: &[usize]) -> Option<Path> {
        let first = self.start_point(block)?.path;
        let leaves = self.leaves();
        let position = leaves.iter().position(|(path, _)| *path == first)?;
        position
            .checked_sub(1)
            .and_then(|prev| leaves.get(prev))
            .map(|(path, _)| path.clone())
    }

    /// Removes the node at `at`, then removes ancestors left empty by it.
    fn take_block(&mut self, at: &[usize]) -> Result<Node, EditError> {
        let (&index, parent_path) = at
            .split_last()
            .ok_or_else(|| EditError::InvalidPath(at.to_vec()))?;
        let siblings = self
            .children_mut(parent_path)
            .ok_or_else(|| EditError::InvalidPath(at.to_vec()))?;
        let removed = siblings.remove(index);

        let mut cursor = parent_path.to_vec();
        while !cursor.is_empty() {
            let empty = self.children(&cursor).is_some_and(Vec::is_empty);
            if !empty {
                break;
            }
            let (&index, up) = cursor.split_last().ok_or(EditError::InvalidPath(Vec::new()))?;
            if let Some(children) = self.children_mut(up) {
                children.remove(index);
            }
            cursor = up.to_vec();
        }
        Ok(removed)
    }

    fn ensure_editable(&self, leaf_path: &[usize]) -> Result<(), EditError> {
        let parent_path = parent(leaf_path);
        if !parent_path.is_empty() && self.element(parent_path)?.is_void() {
            return Err(EditError::VoidElement(parent_path.to_vec()));
        }
        Ok(())
    }
}

/// Splits `children` at the point reached by `rel`/`offset` and returns the
/// tail. Inline elements on the way are split too, the tail copy losing its id.
fn split_children(children: &mut Vec<Node>, rel: &[usize], offset: usize) -> Vec<Node> {
    let Some((&index, rest)) = rel.split_first() else {
        return Vec::new();
    };
    if index >= children.len() {
        return Vec::new();
    }
    let mut tail = Vec::new();
    match &mut children[index] {
        Node::Text(leaf) => {
            if let Some(rest_of_leaf) = leaf.split_off(offset) {
                tail.push(Node::Text(rest_of_leaf));
            }
        }
        Node::Element(element) => {
            let inner = split_children(&mut element.children, rest, offset);
            tail.push(Node::Element(Element {
                id: None,
                kind: element.kind.clone(),
                children: inner,
            }));
        }
    }
    tail.extend(children.drain(index + 1..));
    tail
}
