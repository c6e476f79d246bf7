//! Editing commands and their default behavior.
//!
//! A [`Command`] is what the user asked for: type text, press Enter, drop a
//! dragged block. [`apply_base`] runs the behavior a plain rich-text editor
//! has for each command; the plugin chain in [`crate::plugin`] wraps it to
//! add the block-level rules of this editor.

use crate::core::{BlockType, Element, Leaf, Mark, MarkSet, Node, NodeId, Path, Point, Selection};
use crate::doc::{EditError, EditorState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub mod dnd;

pub use dnd::DragSession;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Command {
    InsertText {
        text: String,
    },
    DeleteBackward,
    InsertBreak,
    ToggleMark {
        mark: Mark,
    },
    /// A key combination such as `mod+b`; unbound combos do nothing.
    Hotkey {
        combo: String,
    },
    Select {
        selection: Option<Selection>,
    },
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
    /// Inserts `block` right after the top-level block at `index`.
    InsertBlockBelow {
        index: usize,
        block: Node,
    },
    RemoveBlock {
        index: usize,
    },
    /// Moves the block with `active_id` to the top-level index currently held
    /// by `over_id`.
    DropBlock {
        active_id: NodeId,
        over_id: Option<NodeId>,
    },
    /// Re-runs the plugin chain without changing anything, used after
    /// loading a document so plugins can repair it.
    Normalize,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::InsertText { .. } => "insert-text",
            Command::DeleteBackward => "delete-backward",
            Command::InsertBreak => "insert-break",
            Command::ToggleMark { .. } => "toggle-mark",
            Command::Hotkey { .. } => "hotkey",
            Command::Select { .. } => "select",
            Command::InsertNode { .. } => "insert-node",
            Command::RemoveNode { .. } => "remove-node",
            Command::MoveNode { .. } => "move-node",
            Command::SetNodeProperties { .. } => "set-node-properties",
            Command::SetBlockType { .. } => "set-block-type",
            Command::InsertBlockBelow { .. } => "insert-block-below",
            Command::RemoveBlock { .. } => "remove-block",
            Command::DropBlock { .. } => "drop-block",
            Command::Normalize => "normalize",
        }
    }
}

/// Default behavior for `command`, without any plugin rules.
pub fn apply_base(state: &mut EditorState, command: &Command) -> Result<(), EditError> {
    match command {
        Command::InsertText { text } => insert_text(state, text),
        Command::DeleteBackward => delete_backward(state),
        Command::InsertBreak => insert_break(state),
        Command::ToggleMark { mark } => toggle_mark(state, *mark),
        Command::Hotkey { combo } => match Mark::from_hotkey(combo) {
            Some(mark) => toggle_mark(state, mark),
            None => Ok(()),
        },
        Command::Select { selection } => state.select(selection.clone()),
        Command::InsertNode { path, node } => state.insert_node(node.clone(), path),
        Command::RemoveNode { path } => state.remove_node(path).map(drop),
        Command::MoveNode { path, to } => state.move_node(path, to).map(drop),
        Command::SetNodeProperties { path, properties } => {
            state.set_node_properties(path, properties.clone())
        }
        Command::SetBlockType { path, block_type } => state.set_block_type(path, *block_type),
        Command::InsertBlockBelow { index, block } => insert_block_below(state, *index, block),
        Command::RemoveBlock { index } => state.remove_node(&[*index]).map(drop),
        Command::DropBlock { active_id, over_id } => drop_block(state, active_id, over_id.as_ref()),
        Command::Normalize => Ok(()),
    }
}

fn insert_text(state: &mut EditorState, text: &str) -> Result<(), EditError> {
    if text.is_empty() {
        return Ok(());
    }
    let selection = state.selection().cloned().ok_or(EditError::NoSelection)?;
    if !selection.is_collapsed() {
        delete_selection(state, &selection)?;
    }
    let point = state.caret().cloned().ok_or(EditError::NoSelection)?;

    let leaf_marks = state.document().leaf(&point.path)?.marks.clone();
    match state.pending_marks().cloned() {
        Some(marks) if marks != leaf_marks => {
            let at = leaf_slot(state, &point)?;
            state.insert_node(Node::Text(Leaf::with_marks(text, marks.clone())), &at)?;
            let end = state
                .document()
                .end_point(&at)
                .ok_or(EditError::InvalidPath(at))?;
            state.select(Some(Selection::collapsed(end)))?;
            // Keep typing with the same marks until the caret moves.
            state.set_pending_marks(Some(marks));
        }
        _ => {
            state.insert_text(&point, text)?;
        }
    }
    Ok(())
}

/// Path where a new leaf goes so that it sits exactly at `point`, splitting
/// the leaf there when the point is in its middle.
fn leaf_slot(state: &mut EditorState, point: &Point) -> Result<Path, EditError> {
    let len = state.document().leaf(&point.path)?.len();
    if point.offset == 0 {
        return Ok(point.path.clone());
    }
    if point.offset < len {
        state.split_leaf(&point.path, point.offset)?;
    }
    let mut next = point.path.clone();
    if let Some(last) = next.last_mut() {
        *last += 1;
    }
    Ok(next)
}

fn delete_backward(state: &mut EditorState) -> Result<(), EditError> {
    let selection = state.selection().cloned().ok_or(EditError::NoSelection)?;
    if !selection.is_collapsed() {
        return delete_selection(state, &selection);
    }
    let point = selection.focus;

    if point.offset > 0 {
        state.remove_text(&point.path, point.offset - 1, point.offset)?;
        return Ok(());
    }

    let block = state
        .document()
        .block_above(&point.path)
        .ok_or_else(|| EditError::InvalidPath(point.path.clone()))?;
    if state.document().is_block_start(&block, &point) {
        let has_previous = state.document().previous_leaf(&block).is_some();
        if !has_previous && !state.document().element(&block)?.is_void() {
            return Ok(());
        }
        let join = state.merge_block(&block)?;
        return state.select(Some(Selection::collapsed(join)));
    }

    // Caret sits after an empty leaf or an inline element inside the block.
    let previous = state
        .document()
        .leaves_under(&block)
        .into_iter()
        .take_while(|(path, _)| *path != point.path)
        .filter(|(_, leaf)| !leaf.is_empty())
        .map(|(path, leaf)| (path, leaf.len()))
        .last();
    if let Some((path, len)) = previous {
        state.remove_text(&path, len - 1, len)?;
        state.select(Some(Selection::collapsed(Point::new(path, len - 1))))?;
    }
    Ok(())
}

fn insert_break(state: &mut EditorState) -> Result<(), EditError> {
    let Some(selection) = state.selection().cloned() else {
        return Ok(());
    };
    if !selection.is_collapsed() {
        delete_selection(state, &selection)?;
    }
    let point = state.caret().cloned().ok_or(EditError::NoSelection)?;
    let block = state
        .document()
        .block_above(&point.path)
        .ok_or_else(|| EditError::InvalidPath(point.path.clone()))?;

    let new_block = if state.document().element(&block)?.is_void() {
        let mut after = block.clone();
        if let Some(last) = after.last_mut() {
            *last += 1;
        }
        state.insert_node(Node::Element(Element::paragraph("")), &after)?;
        after
    } else {
        state.split_block(&point, &block)?
    };
    let start = state
        .document()
        .start_point(&new_block)
        .ok_or(EditError::InvalidPath(new_block))?;
    state.select(Some(Selection::collapsed(start)))
}

/// Deletes the content of an expanded selection and collapses it to the
/// start.
pub(crate) fn delete_selection(state: &mut EditorState, selection: &Selection) -> Result<(), EditError> {
    let start = selection.start().clone();
    let end = selection.end().clone();
    let document = state.document();
    let start_block = document
        .block_above(&start.path)
        .ok_or_else(|| EditError::InvalidPath(start.path.clone()))?;

    let segments: Vec<(Path, usize, usize)> = document
        .leaves()
        .into_iter()
        .filter(|(path, _)| *path >= start.path && *path <= end.path)
        .map(|(path, leaf)| {
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path { end.offset } else { leaf.len() };
            (path, from, to)
        })
        .filter(|(_, from, to)| from < to)
        .collect();
    // Text removal never shifts paths, so order only matters for offsets
    // within a single leaf, which appear once each.
    for (path, from, to) in segments.iter().rev() {
        state.remove_text(path, *from, *to)?;
    }

    state.select(Some(Selection::collapsed(Point::new(end.path.clone(), 0))))?;
    let budget = state.document().leaves().len();
    for _ in 0..budget {
        let Some(caret) = state.caret().cloned() else {
            break;
        };
        let Some(block) = state.document().block_above(&caret.path) else {
            break;
        };
        if block == start_block || state.document().previous_leaf(&block).is_none() {
            break;
        }
        state.merge_block(&block)?;
    }
    state.select(Some(Selection::collapsed(start)))
}

fn toggle_mark(state: &mut EditorState, mark: Mark) -> Result<(), EditError> {
    let selection = state.selection().cloned().ok_or(EditError::NoSelection)?;
    if selection.is_collapsed() {
        let mut marks = match state.pending_marks() {
            Some(marks) => marks.clone(),
            None => state.document().leaf(&selection.focus.path)?.marks.clone(),
        };
        if !marks.remove(&mark) {
            marks.insert(mark);
        }
        state.set_pending_marks(Some(marks));
        return Ok(());
    }

    let start = selection.start().clone();
    let end = selection.end().clone();
    let segments: Vec<(Path, usize, usize, usize, bool)> = state
        .document()
        .leaves()
        .into_iter()
        .filter(|(path, _)| *path >= start.path && *path <= end.path)
        .map(|(path, leaf)| {
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path { end.offset } else { leaf.len() };
            let marked = leaf.has_mark(mark);
            (path, from, to, leaf.len(), marked)
        })
        .filter(|(_, from, to, _, _)| from < to)
        .collect();
    if segments.is_empty() {
        return Ok(());
    }
    let active = segments.iter().all(|(.., marked)| *marked);
    debug!(?mark, active, leaves = segments.len(), "toggling mark");

    // Walk backwards so splits only shift leaves already handled.
    for (path, from, to, len, _) in segments.iter().rev() {
        if *to < *len {
            state.split_leaf(path, *to)?;
        }
        let target = if *from > 0 {
            state.split_leaf(path, *from)?;
            let mut next = path.clone();
            if let Some(last) = next.last_mut() {
                *last += 1;
            }
            next
        } else {
            path.clone()
        };
        let mut marks: MarkSet = state.document().leaf(&target)?.marks.clone();
        if active {
            marks.remove(&mark);
        } else {
            marks.insert(mark);
        }
        state.set_leaf_marks(&target, marks)?;
    }
    Ok(())
}

fn insert_block_below(state: &mut EditorState, index: usize, block: &Node) -> Result<(), EditError> {
    if index >= state.document().len() {
        return Err(EditError::InvalidPath(vec![index]));
    }
    let at = vec![index + 1];
    state.insert_node(block.clone(), &at)?;
    let start = state
        .document()
        .start_point(&at)
        .ok_or(EditError::InvalidPath(at))?;
    state.select(Some(Selection::collapsed(start)))
}

fn drop_block(
    state: &mut EditorState,
    active_id: &NodeId,
    over_id: Option<&NodeId>,
) -> Result<(), EditError> {
    let Some(over_id) = over_id else {
        return Ok(());
    };
    if over_id == active_id {
        return Ok(());
    }
    let Some(over_index) = state.document().top_level_index(over_id) else {
        return Ok(());
    };
    let Some(from) = state.document().find_path_by_id(active_id) else {
        return Ok(());
    };
    debug!(%active_id, %over_id, over_index, "dropping block");
    state.move_node(&from, &[over_index]).map(drop)
}
