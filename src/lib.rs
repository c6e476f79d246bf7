//! wiki-editor: a block-based rich text document model for wiki content.
//!
//! The crate is the editing core behind a wiki page editor. It includes:
//!
//! - **Node model** - typed blocks, inline links, void embeds and marked text leaves
//! - **Document state** - a tree that stays well formed through every operation
//! - **Transforms** - typing, deleting, splitting, marks and drag reordering
//! - **Plugins** - id assignment, markdown shortcuts and block break rules
//! - **Rendering** - editable and read-only HTML with pluggable custom blocks
//! - **Autosave** - debounced saving, publishing and version history
//! - **Storage layer** - checksummed file-backed content store (optional)
//!
//! # Quick Start
//!
//! ```rust
//! use wiki_editor::{Command, Document, Editor, Point, RenderMode, Selection, render_document};
//!
//! let mut editor = Editor::new(Document::new());
//! editor
//!     .execute(&Command::Select {
//!         selection: Some(Selection::collapsed(Point::new(vec![0, 0], 0))),
//!     })
//!     .unwrap();
//! editor.execute(&Command::InsertText { text: "## ".into() }).unwrap();
//! editor.execute(&Command::InsertText { text: "Drops".into() }).unwrap();
//!
//! let html = render_document(editor.document(), RenderMode::ReadOnly);
//! assert_eq!(html, "<h2 id=\"drops\">Drops</h2>");
//! ```
//!
//! # Features
//!
//! - `storage` - Enables the file-backed content store and the `wiki-editor` binary

// Node model
pub mod core;

// Document tree and editor state
pub mod doc;

// Commands and their default behavior
pub mod transform;

// Behavior plugins and the editor
pub mod plugin;

// HTML rendering
pub mod render;

// Published versions
pub mod versions;

// Saving and publishing
pub mod autosave;

pub mod config;

// Optional: Persistent storage layer
#[cfg(feature = "storage")]
pub mod storage;

// Re-export core types
pub use core::{
    BlockType, Element, ElementKind, Leaf, Mark, MarkSet, Node, NodeId, Path, Point, Selection,
    ViewMode,
};

// Re-export doc types
pub use doc::{Document, EditError, EditorState, Operation};

// Re-export transform types
pub use transform::{Command, DragSession, apply_base};

// Re-export plugin types
pub use plugin::{
    BlockBreakPlugin, Editor, IdSource, Next, NodeIdPlugin, Plugin, SequentialIds,
    ShortcutsPlugin, UuidIds, apply_command, default_plugins,
};

// Re-export render types
pub use render::{BlockRenderer, ExtensionRegistry, RenderMode, Renderer, render_document};

// Re-export autosave and version types
pub use autosave::{
    Autosave, AutosaveError, BackendError, ContentBackend, ContentKey, Intent, MemoryBackend,
    Notification, RequestBody, Response, SaveRequest, SaveState,
};
pub use config::{ConfigError, EditorConfig};
pub use versions::{Version, VersionHistory};

// Re-export storage types (feature-gated)
#[cfg(feature = "storage")]
pub use storage::{FileStore, StorageError};
