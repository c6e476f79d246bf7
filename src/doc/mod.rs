//! Document model and state container.
//!
//! A [`Document`] is an ordered sequence of top-level blocks. Every mutation
//! goes through methods that keep the tree well formed:
//!
//! - the document always holds at least one node,
//! - top-level nodes are blocks (never inline elements or bare text),
//! - every non-void element has at least one child,
//! - void elements hold exactly one empty placeholder leaf.
//!
//! [`EditorState`] pairs a document with its selection and the log of
//! operations applied during the session.

use crate::core::{Element, ElementKind, Leaf, Node, NodeId, Path, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

mod ops;
pub mod state;
mod text;

pub use state::{EditorState, Operation};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("path {0:?} does not resolve")]
    InvalidPath(Path),
    #[error("offset {offset} is out of range at {path:?}")]
    InvalidOffset { path: Path, offset: usize },
    #[error("node at {0:?} is not an element")]
    NotAnElement(Path),
    #[error("node at {0:?} is not a text leaf")]
    NotALeaf(Path),
    #[error("element at {0:?} is void")]
    VoidElement(Path),
    #[error("inline nodes cannot be placed at the top level")]
    InlineAtTopLevel,
    #[error("property `{0}` cannot be set directly")]
    ProtectedProperty(String),
    #[error("invalid properties: {0}")]
    InvalidProperties(String),
    #[error("no selection")]
    NoSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Node>", into = "Vec<Node>")]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// A document holding a single empty paragraph.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Element(Element::paragraph(""))],
        }
    }

    /// Builds a document from arbitrary nodes, wrapping stray text and inline
    /// elements at the top level into paragraphs.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut blocks = Vec::with_capacity(nodes.len());
        let mut inline_run: Vec<Node> = Vec::new();
        for node in nodes {
            if node.is_block() {
                if !inline_run.is_empty() {
                    let paragraph = Element::paragraph("").with_children(std::mem::take(&mut inline_run));
                    blocks.push(Node::Element(paragraph));
                }
                blocks.push(node);
            } else {
                inline_run.push(node);
            }
        }
        if !inline_run.is_empty() {
            blocks.push(Node::Element(Element::paragraph("").with_children(inline_run)));
        }

        let mut document = Self { nodes: blocks };
        document.normalize();
        document
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for index in rest {
            node = node.as_element()?.children.get(*index)?;
        }
        Some(node)
    }

    pub(crate) fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get_mut(*first)?;
        for index in rest {
            node = node.as_element_mut()?.children.get_mut(*index)?;
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Result<&Element, EditError> {
        self.node(path)
            .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?
            .as_element()
            .ok_or_else(|| EditError::NotAnElement(path.to_vec()))
    }

    pub(crate) fn element_mut(&mut self, path: &[usize]) -> Result<&mut Element, EditError> {
        self.node_mut(path)
            .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?
            .as_element_mut()
            .ok_or_else(|| EditError::NotAnElement(path.to_vec()))
    }

    pub fn leaf(&self, path: &[usize]) -> Result<&Leaf, EditError> {
        self.node(path)
            .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?
            .as_leaf()
            .ok_or_else(|| EditError::NotALeaf(path.to_vec()))
    }

    pub(crate) fn leaf_mut(&mut self, path: &[usize]) -> Result<&mut Leaf, EditError> {
        self.node_mut(path)
            .ok_or_else(|| EditError::InvalidPath(path.to_vec()))?
            .as_leaf_mut()
            .ok_or_else(|| EditError::NotALeaf(path.to_vec()))
    }

    /// Children of the node at `parent`; the empty path is the document root.
    pub(crate) fn children(&self, parent: &[usize]) -> Option<&Vec<Node>> {
        if parent.is_empty() {
            return Some(&self.nodes);
        }
        self.node(parent)?.as_element().map(|element| &element.children)
    }

    pub(crate) fn children_mut(&mut self, parent: &[usize]) -> Option<&mut Vec<Node>> {
        if parent.is_empty() {
            return Some(&mut self.nodes);
        }
        self.node_mut(parent)?
            .as_element_mut()
            .map(|element| &mut element.children)
    }

    pub fn find_path_by_id(&self, id: &NodeId) -> Option<Path> {
        fn search(nodes: &[Node], id: &NodeId, prefix: &mut Path) -> bool {
            for (index, node) in nodes.iter().enumerate() {
                let Node::Element(element) = node else {
                    continue;
                };
                prefix.push(index);
                if element.id.as_ref() == Some(id) || search(&element.children, id, prefix) {
                    return true;
                }
                prefix.pop();
            }
            false
        }

        let mut path = Vec::new();
        search(&self.nodes, id, &mut path).then_some(path)
    }

    pub fn top_level_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id() == Some(id))
    }

    /// Ids of the top-level blocks in order, as used for sortable drag targets.
    pub fn top_level_ids(&self) -> Vec<&NodeId> {
        self.nodes.iter().filter_map(Node::id).collect()
    }

    /// Every leaf in document order.
    pub fn leaves(&self) -> Vec<(Path, &Leaf)> {
        let mut out = Vec::new();
        collect_leaves(&self.nodes, &mut Vec::new(), &mut out);
        out
    }

    /// Leaves below the node at `path` in document order.
    pub fn leaves_under(&self, path: &[usize]) -> Vec<(Path, &Leaf)> {
        let mut out = Vec::new();
        match self.node(path) {
            Some(Node::Text(leaf)) => out.push((path.to_vec(), leaf)),
            Some(Node::Element(element)) => {
                collect_leaves(&element.children, &mut path.to_vec(), &mut out)
            }
            None => {}
        }
        out
    }

    /// Leaf paths between two points, inclusive, in document order.
    pub fn leaf_paths_between(&self, start: &Point, end: &Point) -> Vec<Path> {
        self.leaves()
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| *path >= start.path && *path <= end.path)
            .collect()
    }

    /// The lowest block element strictly above `path`.
    pub fn block_above(&self, path: &[usize]) -> Option<Path> {
        (1..path.len()).rev().map(|len| &path[..len]).find_map(|prefix| {
            let element = self.node(prefix)?.as_element()?;
            (!element.is_inline()).then(|| prefix.to_vec())
        })
    }

    pub fn start_point(&self, path: &[usize]) -> Option<Point> {
        let (leaf_path, _) = self.leaves_under(path).into_iter().next()?;
        Some(Point::new(leaf_path, 0))
    }

    pub fn end_point(&self, path: &[usize]) -> Option<Point> {
        let (leaf_path, leaf) = self.leaves_under(path).into_iter().last()?;
        let offset = leaf.len();
        Some(Point::new(leaf_path, offset))
    }

    /// Concatenated text of the node at `path`.
    pub fn text(&self, path: &[usize]) -> Option<String> {
        self.node(path).map(Node::text)
    }

    /// Text between two points in document order.
    pub fn text_between(&self, start: &Point, end: &Point) -> String {
        let mut out = String::new();
        for path in self.leaf_paths_between(start, end) {
            let Ok(leaf) = self.leaf(&path) else {
                continue;
            };
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path { end.offset } else { leaf.len() };
            if let Some(slice) = leaf.slice(from, to) {
                out.push_str(slice);
            }
        }
        out
    }

    /// True when nothing but empty leaves precede `point` inside `block`.
    pub fn is_block_start(&self, block: &[usize], point: &Point) -> bool {
        for (path, leaf) in self.leaves_under(block) {
            if path == point.path {
                return point.offset == 0;
            }
            if !leaf.is_empty() {
                return false;
            }
        }
        false
    }

    pub fn is_valid_point(&self, point: &Point) -> bool {
        self.leaf(&point.path)
            .map(|leaf| point.offset <= leaf.len())
            .unwrap_or(false)
    }

    /// The closest valid point to a possibly stale `path`/`offset` pair.
    pub fn nearest_point(&self, path: &[usize], offset: usize) -> Point {
        let mut resolved = Vec::with_capacity(path.len().max(2));
        let mut siblings = &self.nodes;
        let mut depth = 0;
        loop {
            let hint = path.get(depth).copied().unwrap_or(0);
            let index = hint.min(siblings.len().saturating_sub(1));
            resolved.push(index);
            match siblings.get(index) {
                Some(Node::Element(element)) => siblings = &element.children,
                Some(Node::Text(leaf)) => {
                    let on_path = resolved.as_slice() == path;
                    let offset = if on_path { offset.min(leaf.len()) } else { 0 };
                    return Point::new(resolved, offset);
                }
                None => return Point::new(resolved, 0),
            }
            depth += 1;
        }
    }

    /// Number of elements that have not been assigned an id yet.
    pub fn missing_ids(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .filter_map(Node::as_element)
                .map(|element| usize::from(element.id.is_none()) + count(&element.children))
                .sum()
        }
        count(&self.nodes)
    }

    /// Ids used by more than one element.
    pub fn duplicate_ids(&self) -> Vec<NodeId> {
        fn walk<'a>(nodes: &'a [Node], seen: &mut BTreeSet<&'a NodeId>, dupes: &mut BTreeSet<NodeId>) {
            for element in nodes.iter().filter_map(Node::as_element) {
                if let Some(id) = &element.id
                    && !seen.insert(id)
                {
                    dupes.insert(id.clone());
                }
                walk(&element.children, seen, dupes);
            }
        }

        let mut seen = BTreeSet::new();
        let mut dupes = BTreeSet::new();
        walk(&self.nodes, &mut seen, &mut dupes);
        dupes.into_iter().collect()
    }

    /// Distinct tags of custom blocks anywhere in the tree, sorted.
    pub fn extension_tags(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [Node], tags: &mut BTreeSet<&'a str>) {
            for element in nodes.iter().filter_map(Node::as_element) {
                if let ElementKind::Extension { tag, .. } = &element.kind {
                    tags.insert(tag.as_str());
                }
                walk(&element.children, tags);
            }
        }

        let mut tags = BTreeSet::new();
        walk(&self.nodes, &mut tags);
        tags.into_iter().collect()
    }

    /// Restores the structural invariants after a mutation.
    pub(crate) fn normalize(&mut self) {
        for node in &mut self.nodes {
            normalize_node(node);
        }
        if self.nodes.is_empty() {
            self.nodes.push(Node::Element(Element::paragraph("")));
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Node>> for Document {
    fn from(nodes: Vec<Node>) -> Self {
        Self::from_nodes(nodes)
    }
}

impl From<Document> for Vec<Node> {
    fn from(document: Document) -> Self {
        document.nodes
    }
}

pub(crate) fn normalize_node(node: &mut Node) {
    let Node::Element(element) = node else {
        return;
    };
    if element.is_void() {
        let placeholder_only = matches!(
            element.children.as_slice(),
            [Node::Text(leaf)] if leaf.is_empty() && leaf.marks.is_empty()
        );
        if !placeholder_only {
            element.children = vec![Node::Text(Leaf::default())];
        }
        return;
    }
    if element.children.is_empty() {
        element.children.push(Node::Text(Leaf::default()));
    }
    for child in &mut element.children {
        normalize_node(child);
    }
}

fn collect_leaves<'a>(nodes: &'a [Node], prefix: &mut Path, out: &mut Vec<(Path, &'a Leaf)>) {
    for (index, node) in nodes.iter().enumerate() {
        prefix.push(index);
        match node {
            Node::Text(leaf) => out.push((prefix.clone(), leaf)),
            Node::Element(element) => collect_leaves(&element.children, prefix, out),
        }
        prefix.pop();
    }
}
