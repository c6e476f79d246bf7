//! Editor state: a document, its selection and the operation log.
//!
//! Every mutation of the document during a session goes through
//! [`EditorState`], which records the applied [`Operation`] and carries the
//! selection along so it keeps pointing at the same text.

use super::{Document, EditError};
use crate::core::path::{transform_insert, transform_move, transform_remove};
use crate::core::{BlockType, MarkSet, Node, NodeId, Path, Point, Selection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A primitive change to the editor state, as recorded in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
    },
    MoveNode {
        path: Path,
        to: Path,
    },
    SetNodeProperties {
        path: Path,
        properties: Map<String, Value>,
    },
    SetBlockType {
        path: Path,
        block_type: BlockType,
    },
    AssignId {
        path: Path,
        id: NodeId,
    },
    InsertText {
        point: Point,
        text: String,
    },
    RemoveText {
        path: Path,
        start: usize,
        end: usize,
    },
    SplitLeaf {
        path: Path,
        offset: usize,
    },
    SetMarks {
        path: Path,
        marks: MarkSet,
    },
    SplitBlock {
        point: Point,
        block: Path,
    },
    MergeBlock {
        block: Path,
    },
    SetSelection {
        selection: Option<Selection>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    document: Document,
    selection: Option<Selection>,
    pending_marks: Option<MarkSet>,
    operations: Vec<Operation>,
}

impl EditorState {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            selection: None,
            pending_marks: None,
            operations: Vec::new(),
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Result<Self, EditError> {
        self.select(Some(selection))?;
        Ok(self)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The collapsed caret, if the selection is collapsed.
    pub fn caret(&self) -> Option<&Point> {
        self.selection
            .as_ref()
            .filter(|selection| selection.is_collapsed())
            .map(|selection| &selection.focus)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn take_operations(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    /// Marks to apply to the next inserted text, set by toggling a mark on a
    /// collapsed selection.
    pub fn pending_marks(&self) -> Option<&MarkSet> {
        self.pending_marks.as_ref()
    }

    pub fn set_pending_marks(&mut self, marks: Option<MarkSet>) {
        self.pending_marks = marks;
    }

    pub fn select(&mut self, selection: Option<Selection>) -> Result<(), EditError> {
        if let Some(selection) = &selection {
            for point in [&selection.anchor, &selection.focus] {
                if !self.document.is_valid_point(point) {
                    return Err(EditError::InvalidOffset {
                        path: point.path.clone(),
                        offset: point.offset,
                    });
                }
            }
        }
        self.pending_marks = None;
        self.selection = selection.clone();
        self.record(Operation::SetSelection { selection });
        Ok(())
    }

    pub fn insert_node(&mut self, node: Node, at: &[usize]) -> Result<(), EditError> {
        self.document.insert_node(node.clone(), at)?;
        self.map_selection(|_, point| Point::new(transform_insert(&point.path, at), point.offset));
        self.record(Operation::InsertNode {
            path: at.to_vec(),
            node,
        });
        Ok(())
    }

    pub fn remove_node(&mut self, at: &[usize]) -> Result<Node, EditError> {
        let removed = self.document.remove_node(at)?;
        self.map_selection(|document, point| match transform_remove(&point.path, at) {
            Some(path) => Point::new(path, point.offset),
            None => document.nearest_point(at, 0),
        });
        self.record(Operation::RemoveNode { path: at.to_vec() });
        Ok(removed)
    }

    pub fn move_node(&mut self, from: &[usize], to: &[usize]) -> Result<Path, EditError> {
        let target = self.document.move_node(from, to)?;
        if target != from {
            debug!(?from, ?target, "moved node");
            self.map_selection(|_, point| {
                Point::new(transform_move(&point.path, from, &target), point.offset)
            });
        }
        self.record(Operation::MoveNode {
            path: from.to_vec(),
            to: to.to_vec(),
        });
        Ok(target)
    }

    pub fn set_node_properties(
        &mut self,
        at: &[usize],
        properties: Map<String, Value>,
    ) -> Result<(), EditError> {
        self.document.set_node_properties(at, &properties)?;
        self.record(Operation::SetNodeProperties {
            path: at.to_vec(),
            properties,
        });
        Ok(())
    }

    pub fn set_block_type(&mut self, at: &[usize], block_type: BlockType) -> Result<(), EditError> {
        self.document.set_block_type(at, block_type)?;
        // Converting to a void type drops the text below it.
        self.map_selection(|_, point| point.clone());
        self.record(Operation::SetBlockType {
            path: at.to_vec(),
            block_type,
        });
        Ok(())
    }

    pub fn assign_id(&mut self, at: &[usize], id: NodeId) -> Result<bool, EditError> {
        let assigned = self.document.assign_id(at, id.clone())?;
        if assigned {
            self.record(Operation::AssignId {
                path: at.to_vec(),
                id,
            });
        }
        Ok(assigned)
    }

    /// Elements still waiting for an id, parents first.
    pub fn paths_missing_id(&self) -> Vec<Path> {
        self.document.paths_missing_id()
    }

    /// Inserts text and returns the caret offset just past it. Points at or
    /// after the insertion offset in the same leaf shift forward.
    pub fn insert_text(&mut self, point: &Point, text: &str) -> Result<usize, EditError> {
        let caret = self.document.insert_text(point, text)?;
        let inserted = caret.saturating_sub(point.offset);
        self.map_selection(|_, other| {
            if other.path == point.path && other.offset >= point.offset {
                Point::new(other.path.clone(), other.offset + inserted)
            } else {
                other.clone()
            }
        });
        self.record(Operation::InsertText {
            point: point.clone(),
            text: text.to_string(),
        });
        Ok(caret)
    }

    pub fn remove_text(&mut self, path: &[usize], start: usize, end: usize) -> Result<String, EditError> {
        let removed = self.document.remove_text(path, start, end)?;
        self.map_selection(|_, point| {
            if point.path != path || point.offset <= start {
                return point.clone();
            }
            let offset = if point.offset >= end {
                point.offset - (end - start)
            } else {
                start
            };
            Point::new(point.path.clone(), offset)
        });
        self.record(Operation::RemoveText {
            path: path.to_vec(),
            start,
            end,
        });
        Ok(removed)
    }

    pub fn split_leaf(&mut self, path: &[usize], offset: usize) -> Result<(), EditError> {
        self.document.split_leaf(path, offset)?;
        let mut next = path.to_vec();
        if let Some(last) = next.last_mut() {
            *last += 1;
        }
        self.map_selection(|_, point| {
            if point.path == path && point.offset >= offset {
                Point::new(next.clone(), point.offset - offset)
            } else {
                Point::new(transform_insert(&point.path, &next), point.offset)
            }
        });
        self.record(Operation::SplitLeaf {
            path: path.to_vec(),
            offset,
        });
        Ok(())
    }

    pub fn set_leaf_marks(&mut self, path: &[usize], marks: MarkSet) -> Result<(), EditError> {
        self.document.set_leaf_marks(path, marks.clone())?;
        self.record(Operation::SetMarks {
            path: path.to_vec(),
            marks,
        });
        Ok(())
    }

    /// Splits `block` at `point` and returns the new block's path. Points at
    /// or past the split move into the new block.
    pub fn split_block(&mut self, point: &Point, block: &[usize]) -> Result<Path, EditError> {
        let before = self.leaf_positions();
        let split_leaf = leaf_index(&self.document, &point.path);
        let new_path = self.document.split_block(point, block)?;
        let after = leaf_paths(&self.document);

        self.remap_by_leaf(&before, &after, |index, offset| match split_leaf {
            Some(split) if index == split && offset >= point.offset => (index + 1, offset - point.offset),
            Some(split) if index > split => (index + 1, offset),
            _ => (index, offset),
        });
        self.record(Operation::SplitBlock {
            point: point.clone(),
            block: block.to_vec(),
        });
        Ok(new_path)
    }

    /// Merges `block` into the previous block and returns the join point.
    pub fn merge_block(&mut self, block: &[usize]) -> Result<Point, EditError> {
        let before = self.leaf_positions();
        let count_before = self.document.leaves().len();
        let join = self.document.merge_block(block)?;
        let after = leaf_paths(&self.document);

        if after.len() == count_before {
            self.remap_by_leaf(&before, &after, |index, offset| (index, offset));
        } else {
            // A void placeholder went away; park the selection at the join.
            self.selection = self
                .selection
                .as_ref()
                .map(|_| Selection::collapsed(join.clone()));
        }
        self.record(Operation::MergeBlock {
            block: block.to_vec(),
        });
        Ok(join)
    }

    /// Replays a recorded operation.
    pub fn apply(&mut self, operation: &Operation) -> Result<(), EditError> {
        match operation {
            Operation::InsertNode { path, node } => self.insert_node(node.clone(), path),
            Operation::RemoveNode { path } => self.remove_node(path).map(drop),
            Operation::MoveNode { path, to } => self.move_node(path, to).map(drop),
            Operation::SetNodeProperties { path, properties } => {
                self.set_node_properties(path, properties.clone())
            }
            Operation::SetBlockType { path, block_type } => self.set_block_type(path, *block_type),
            Operation::AssignId { path, id } => self.assign_id(path, id.clone()).map(drop),
            Operation::InsertText { point, text } => self.insert_text(point, text).map(drop),
            Operation::RemoveText { path, start, end } => {
                self.remove_text(path, *start, *end).map(drop)
            }
            Operation::SplitLeaf { path, offset } => self.split_leaf(path, *offset),
            Operation::SetMarks { path, marks } => self.set_leaf_marks(path, marks.clone()),
            Operation::SplitBlock { point, block } => self.split_block(point, block).map(drop),
            Operation::MergeBlock { block } => self.merge_block(block).map(drop),
            Operation::SetSelection { selection } => self.select(selection.clone()),
        }
    }

    fn record(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Rewrites both selection points, then clamps them to valid positions.
    fn map_selection(&mut self, f: impl Fn(&Document, &Point) -> Point) {
        let Some(selection) = self.selection.take() else {
            return;
        };
        let document = &self.document;
        let clamp = |point: Point| {
            if document.is_valid_point(&point) {
                point
            } else {
                document.nearest_point(&point.path, point.offset)
            }
        };
        let anchor = clamp(f(document, &selection.anchor));
        let focus = clamp(f(document, &selection.focus));
        self.selection = Some(Selection::new(anchor, focus));
    }

    fn leaf_positions(&self) -> Option<[(usize, usize); 2]> {
        let selection = self.selection.as_ref()?;
        let anchor = leaf_index(&self.document, &selection.anchor.path)?;
        let focus = leaf_index(&self.document, &selection.focus.path)?;
        Some([
            (anchor, selection.anchor.offset),
            (focus, selection.focus.offset),
        ])
    }

    /// Maps the selection through a change expressed in document-order leaf
    /// indices, for operations that reshape the tree but keep leaf order.
    fn remap_by_leaf(
        &mut self,
        before: &Option<[(usize, usize); 2]>,
        after: &[Path],
        f: impl Fn(usize, usize) -> (usize, usize),
    ) {
        let Some([anchor, focus]) = before else {
            self.map_selection(|_, point| point.clone());
            return;
        };
        let resolve = |(index, offset): (usize, usize)| {
            let (index, offset) = f(index, offset);
            match after.get(index) {
                Some(path) => Point::new(path.clone(), offset),
                None => Point::new(after.last().cloned().unwrap_or_default(), 0),
            }
        };
        let anchor = resolve(*anchor);
        let focus = resolve(*focus);
        self.selection = Some(Selection::new(anchor, focus));
        self.map_selection(|_, point| point.clone());
    }
}

fn leaf_paths(document: &Document) -> Vec<Path> {
    document.leaves().into_iter().map(|(path, _)| path).collect()
}

fn leaf_index(document: &Document, path: &[usize]) -> Option<usize> {
    document.leaves().iter().position(|(leaf, _)| leaf.as_slice() == path)
}
