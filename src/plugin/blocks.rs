//! Block-level typing rules: markdown-style shortcuts, Enter and Backspace.

use super::{Next, Plugin};
use crate::core::{BlockType, Element, ElementKind, Node, Selection};
use crate::doc::{EditError, EditorState};
use crate::transform::{Command, apply_base};
use serde_json::{Map, Value};
use tracing::debug;

/// Text typed at the start of a block, followed by a space, that converts
/// the block.
pub const SHORTCUTS: [(&str, BlockType); 6] = [
    ("*", BlockType::BulletedList),
    ("-", BlockType::BulletedList),
    ("+", BlockType::BulletedList),
    ("##", BlockType::H2),
    ("###", BlockType::H3),
    ("[]", BlockType::ToDo),
];

pub fn shortcut(trigger: &str) -> Option<BlockType> {
    SHORTCUTS
        .iter()
        .find(|(text, _)| *text == trigger)
        .map(|(_, block_type)| *block_type)
}

/// The kind of block created by pressing Enter at the end of `kind`.
pub fn successor(kind: &ElementKind) -> ElementKind {
    match kind {
        ElementKind::ToDo { .. } => ElementKind::ToDo { checked: false },
        ElementKind::BulletedList | ElementKind::NumberedList | ElementKind::ListItem => kind.clone(),
        _ => ElementKind::Paragraph,
    }
}

/// Expands [`SHORTCUTS`] when a space is typed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutsPlugin;

impl ShortcutsPlugin {
    /// Converts the block around a collapsed caret when the text from the
    /// block start to the caret plus `typed` is a trigger. Returns whether
    /// the shortcut fired.
    fn expand(&self, state: &mut EditorState, typed: &str) -> Result<bool, EditError> {
        let Some(caret) = state.caret().cloned() else {
            return Ok(false);
        };
        let document = state.document();
        let Some(block) = document.block_above(&caret.path) else {
            return Ok(false);
        };
        let Some(start) = document.start_point(&block) else {
            return Ok(false);
        };
        let before = document.text_between(&start, &caret) + typed;
        let Some(block_type) = shortcut(&before) else {
            return Ok(false);
        };

        debug!(trigger = %before, %block_type, "expanding shortcut");
        if start != caret {
            state.select(Some(Selection::new(caret, start.clone())))?;
            apply_base(state, &Command::DeleteBackward)?;
        }
        state.set_block_type(&block, block_type)?;
        Ok(true)
    }
}

impl Plugin for ShortcutsPlugin {
    fn name(&self) -> &'static str {
        "shortcuts"
    }

    fn handle(&self, state: &mut EditorState, command: &Command, next: Next<'_>) -> Result<(), EditError> {
        if let Command::InsertText { text } = command
            && let Some(typed) = text.strip_suffix(' ')
            && self.expand(state, typed)?
        {
            return Ok(());
        }
        next.run(state, command)
    }
}

/// Enter and Backspace rules for blocks.
///
/// - Enter at the very start of a top-level block inserts an empty paragraph
///   above it. The block keeps its id, type and content and the caret stays
///   in it.
/// - Enter elsewhere in a top-level block splits it; the new block takes the
///   [`successor`] kind.
/// - Backspace at the start of a block that is not a paragraph turns it into
///   a paragraph instead of merging it into the previous block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockBreakPlugin;

impl BlockBreakPlugin {
    fn insert_break(&self, state: &mut EditorState, command: &Command, next: Next<'_>) -> Result<(), EditError> {
        let Some(selection) = state.selection().cloned() else {
            return next.run(state, command);
        };
        if !selection.is_collapsed() {
            apply_base(state, &Command::DeleteBackward)?;
        }
        let Some(caret) = state.caret().cloned() else {
            return next.run(state, command);
        };
        let Some(block) = state.document().block_above(&caret.path) else {
            return next.run(state, command);
        };
        let element = state.document().element(&block)?;
        if block.len() != 1 || element.is_void() {
            return next.run(state, command);
        }
        let kind = successor(&element.kind);

        if state.document().is_block_start(&block, &caret) {
            debug!(?block, "break at block start");
            return state.insert_node(Node::Element(Element::paragraph("")), &block);
        }

        next.run(state, command)?;
        let Some(new_block) = state.caret().and_then(|caret| state.document().block_above(&caret.path)) else {
            return Ok(());
        };
        if state.document().element(&new_block)?.kind == kind {
            return Ok(());
        }
        let block_type = kind.block_type().unwrap_or(BlockType::Paragraph);
        state.set_block_type(&new_block, block_type)?;
        if let ElementKind::ToDo { checked } = kind {
            let mut properties = Map::new();
            properties.insert("checked".to_string(), Value::Bool(checked));
            state.set_node_properties(&new_block, properties)?;
        }
        Ok(())
    }

    fn delete_backward(&self, state: &mut EditorState, command: &Command, next: Next<'_>) -> Result<(), EditError> {
        let Some(caret) = state.caret().cloned() else {
            return next.run(state, command);
        };
        let Some(block) = state.document().block_above(&caret.path) else {
            return next.run(state, command);
        };
        let element = state.document().element(&block)?;
        let convert = element.kind != ElementKind::Paragraph
            && !element.is_void()
            && state.document().is_block_start(&block, &caret);
        if !convert {
            return next.run(state, command);
        }
        debug!(?block, from = element.tag(), "backspace converts block to paragraph");
        state.set_block_type(&block, BlockType::Paragraph)?;
        let start = state.document().start_point(&block).unwrap_or(caret);
        state.select(Some(Selection::collapsed(start)))
    }
}

impl Plugin for BlockBreakPlugin {
    fn name(&self) -> &'static str {
        "block-break"
    }

    fn handle(&self, state: &mut EditorState, command: &Command, next: Next<'_>) -> Result<(), EditError> {
        match command {
            Command::InsertBreak => self.insert_break(state, command, next),
            Command::DeleteBackward => self.delete_backward(state, command, next),
            _ => next.run(state, command),
        }
    }
}
