use super::{Next, Plugin};
use crate::core::NodeId;
use crate::doc::{EditError, EditorState};
use crate::transform::Command;
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces fresh node ids.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> NodeId;
}

/// Random UUID v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> NodeId {
        NodeId::random()
    }
}

/// Predictable ids `n1`, `n2`, ... for tests and replays.
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: AtomicU64::new(first.saturating_sub(1)),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> NodeId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        NodeId::new(format!("n{n}"))
    }
}

/// Gives every element an id once the rest of the chain has run, including
/// elements nested inside inserted subtrees.
pub struct NodeIdPlugin {
    ids: Box<dyn IdSource>,
}

impl NodeIdPlugin {
    pub fn new(ids: impl IdSource + 'static) -> Self {
        Self { ids: Box::new(ids) }
    }
}

impl Plugin for NodeIdPlugin {
    fn name(&self) -> &'static str {
        "node-id"
    }

    fn handle(&self, state: &mut EditorState, command: &Command, next: Next<'_>) -> Result<(), EditError> {
        next.run(state, command)?;
        for path in state.paths_missing_id() {
            state.assign_id(&path, self.ids.next_id())?;
        }
        Ok(())
    }
}
