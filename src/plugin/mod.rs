//! Behavior plugins and the editor that runs them.
//!
//! A [`Plugin`] intercepts a [`Command`] before the default behavior in
//! [`apply_base`] runs. Plugins form an ordered chain: each one decides
//! whether to handle the command itself, pass it on through [`Next`], or do
//! both. The chain ends in the default behavior.

use crate::doc::{Document, EditError, EditorState, Operation};
use crate::transform::{Command, apply_base};
use std::fmt;
use tracing::{debug, warn};

mod blocks;
mod ids;

pub use blocks::{BlockBreakPlugin, SHORTCUTS, ShortcutsPlugin, shortcut, successor};
pub use ids::{IdSource, NodeIdPlugin, SequentialIds, UuidIds};

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Handles `command`, calling `next.run` to fall through to the rest of
    /// the chain.
    fn handle(&self, state: &mut EditorState, command: &Command, next: Next<'_>) -> Result<(), EditError>;
}

/// The part of the chain after the current plugin.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    plugins: &'a [Box<dyn Plugin>],
}

impl<'a> Next<'a> {
    pub fn new(plugins: &'a [Box<dyn Plugin>]) -> Self {
        Self { plugins }
    }

    pub fn run(self, state: &mut EditorState, command: &Command) -> Result<(), EditError> {
        match self.plugins.split_first() {
            Some((plugin, rest)) => plugin.handle(state, command, Next::new(rest)),
            None => apply_base(state, command),
        }
    }
}

/// The plugins every editor runs, in order: id assignment wraps everything
/// so that blocks created by later plugins get ids too.
pub fn default_plugins(ids: impl IdSource + 'static) -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(NodeIdPlugin::new(ids)),
        Box::new(ShortcutsPlugin),
        Box::new(BlockBreakPlugin),
    ]
}

/// Runs `command` through `plugins` against a copy of `state`. The input is
/// left untouched whether or not the command succeeds.
pub fn apply_command(
    state: &EditorState,
    command: &Command,
    plugins: &[Box<dyn Plugin>],
) -> Result<EditorState, EditError> {
    let mut next_state = state.clone();
    Next::new(plugins).run(&mut next_state, command)?;
    Ok(next_state)
}

pub struct Editor {
    state: EditorState,
    plugins: Vec<Box<dyn Plugin>>,
}

impl Editor {
    /// An editor with the default plugins and random ids.
    pub fn new(document: Document) -> Self {
        Self::with_plugins(document, default_plugins(UuidIds))
    }

    pub fn with_id_source(document: Document, ids: impl IdSource + 'static) -> Self {
        Self::with_plugins(document, default_plugins(ids))
    }

    /// Loads `document` and lets the plugins repair it, which assigns ids to
    /// any element stored without one.
    pub fn with_plugins(document: Document, plugins: Vec<Box<dyn Plugin>>) -> Self {
        let mut editor = Self {
            state: EditorState::new(document),
            plugins,
        };
        if let Err(err) = editor.execute(&Command::Normalize) {
            warn!(%err, "normalizing loaded document failed");
        }
        editor.state.take_operations();
        editor
    }

    /// Applies `command`. On error the editor state is exactly what it was
    /// before the call.
    pub fn execute(&mut self, command: &Command) -> Result<(), EditError> {
        match apply_command(&self.state, command, &self.plugins) {
            Ok(state) => {
                debug!(
                    command = command.name(),
                    operations = state.operations().len().saturating_sub(self.state.operations().len()),
                    "applied command"
                );
                self.state = state;
                Ok(())
            }
            Err(err) => {
                warn!(command = command.name(), %err, "command rejected");
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn document(&self) -> &Document {
        self.state.document()
    }

    pub fn take_operations(&mut self) -> Vec<Operation> {
        self.state.take_operations()
    }

    pub fn into_document(self) -> Document {
        self.state.into_document()
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("plugins", &self.plugin_names())
            .finish()
    }
}
