//! Drag-and-drop reordering of top-level blocks.

use super::Command;
use crate::core::{Element, NodeId};
use crate::doc::Document;

/// Transient state of one drag gesture. The active id is cleared on every
/// end or cancel, whether or not a move happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragSession {
    active_id: Option<NodeId>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts dragging `id` and returns the command that clears the
    /// selection while the block is in flight.
    pub fn start(&mut self, id: NodeId) -> Command {
        self.active_id = Some(id);
        Command::Select { selection: None }
    }

    pub fn active_id(&self) -> Option<&NodeId> {
        self.active_id.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.active_id.is_some()
    }

    /// The top-level block being dragged, for drawing the drag overlay.
    pub fn active_element<'a>(&self, document: &'a Document) -> Option<&'a Element> {
        let id = self.active_id.as_ref()?;
        document
            .nodes()
            .iter()
            .filter_map(|node| node.as_element())
            .find(|element| element.id.as_ref() == Some(id))
    }

    /// Ends the gesture over `over_id`. Returns the drop command when there
    /// is something to move; the command itself re-checks the target.
    pub fn end(&mut self, over_id: Option<NodeId>) -> Option<Command> {
        let active_id = self.active_id.take()?;
        let over_id = over_id?;
        (over_id != active_id).then_some(Command::DropBlock {
            active_id,
            over_id: Some(over_id),
        })
    }

    pub fn cancel(&mut self) {
        self.active_id = None;
    }
}
