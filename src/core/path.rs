//! Paths, points and selections.
//!
//! A [`Path`] is the list of child indices leading from the document root to a
//! node. Paths compare lexicographically, which matches document order for
//! nodes that are not ancestors of one another.

use serde::{Deserialize, Serialize};

pub type Path = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// Anchor is where the selection started, focus is where it ends; either may
/// come first in document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> &Point {
        if self.focus < self.anchor {
            &self.focus
        } else {
            &self.anchor
        }
    }

    pub fn end(&self) -> &Point {
        if self.focus < self.anchor {
            &self.anchor
        } else {
            &self.focus
        }
    }
}

pub fn parent(path: &[usize]) -> &[usize] {
    match path.split_last() {
        Some((_, parent)) => parent,
        None => path,
    }
}

/// True when `ancestor` is a strict prefix of `path`.
pub fn is_ancestor(ancestor: &[usize], path: &[usize]) -> bool {
    ancestor.len() < path.len() && path.starts_with(ancestor)
}

/// Where `path` ends up after a node is inserted at `at`.
pub fn transform_insert(path: &[usize], at: &[usize]) -> Path {
    let mut result = path.to_vec();
    if let Some((&index, at_parent)) = at.split_last() {
        let depth = at_parent.len();
        if path.len() > depth && path.starts_with(at_parent) && path[depth] >= index {
            result[depth] += 1;
        }
    }
    result
}

/// Where `path` ends up after the node at `at` is removed, or `None` when it
/// lived inside the removed subtree.
pub fn transform_remove(path: &[usize], at: &[usize]) -> Option<Path> {
    if path.starts_with(at) {
        return None;
    }
    let mut result = path.to_vec();
    if let Some((&index, at_parent)) = at.split_last() {
        let depth = at_parent.len();
        if path.len() > depth && path.starts_with(at_parent) && path[depth] > index {
            result[depth] -= 1;
        }
    }
    Some(result)
}

/// Resolves a move destination given in pre-move coordinates into the path
/// the node occupies once the move completes.
pub fn move_target(from: &[usize], to: &[usize]) -> Path {
    let mut target = to.to_vec();
    if let Some((&index, from_parent)) = from.split_last() {
        let depth = from_parent.len();
        if from.len() < to.len() && to.starts_with(from_parent) && index < to[depth] {
            target[depth] -= 1;
        }
    }
    target
}

/// Where `path` ends up after the node at `from` moves to `target` (a path
/// already resolved with [`move_target`]).
pub fn transform_move(path: &[usize], from: &[usize], target: &[usize]) -> Path {
    if path.starts_with(from) {
        let mut moved = target.to_vec();
        moved.extend_from_slice(&path[from.len()..]);
        return moved;
    }
    match transform_remove(path, from) {
        Some(removed) => transform_insert(&removed, target),
        None => path.to_vec(),
    }
}
