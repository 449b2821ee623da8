//! Horizon Outline - a hierarchical editable table controller.
//!
//! This crate turns trees of domain records into table rows and keeps every
//! edit to those trees undoable:
//!
//! - **Records**: domain types implement [`Record`]; a [`RecordTree`] owns
//!   them and a [`NodeTree`] projects them into rows with cached cell renders
//! - **Providers**: a [`TableProvider`] owns one collection and decides how it
//!   is shown, serialized, created and dropped; [`ListProvider`] covers the
//!   common cases
//! - **Tables**: [`Table`] adds selection, filtering and sorting on top of a
//!   provider
//! - **Workspace**: [`Workspace`] owns windows, documents and tables and runs
//!   undoable operations, drag and drop, and background work
//!
//! # Example
//!
//! ```ignore
//! use horizon_outline::prelude::*;
//!
//! let mut workspace = Workspace::default();
//! let window = workspace.add_window("Character Sheet", true);
//! let traits = workspace.add_table(window, None, trait_provider)?;
//!
//! workspace.create_item::<TraitProvider>(traits, ItemVariant::Plain)?;
//! workspace.undo(window)?;
//! ```

pub mod codec;
pub mod columns;
pub mod drag;
mod error;
pub mod keys;
pub mod logging;
pub mod model;
pub mod ops;
pub mod provider;
pub mod settings;
pub mod table;
pub mod undo;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use horizon_outline_core::{Signal, UiPoster, ViewToken};

pub use columns::ColumnWidths;
pub use drag::{DragPayload, DropOutcome, DropRejection, DropTarget};
pub use error::{OutlineError, Result};
pub use keys::{DocumentId, TableId, WindowId};
pub use model::{
    CellData, CloneContext, ColumnId, Filter, ItemVariant, Record, RecordId, RecordKey,
    RecordTree, Subtree,
};
pub use ops::{EditorRegistry, NameableResolver};
pub use provider::{ListProvider, ListProviderBuilder, TableProvider, TableRef};
pub use settings::OutlineSettings;
pub use table::Table;
pub use undo::{EditorSession, UndoManager};
pub use workspace::Workspace;

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::drag::{DragPayload, DropOutcome, DropRejection, DropTarget};
    pub use crate::error::{OutlineError, Result};
    pub use crate::keys::{DocumentId, TableId, WindowId};
    pub use crate::model::{
        CellData, CellType, CloneContext, ColumnId, Filter, ItemVariant, Record, RecordId,
        RecordKey, RecordTree, SelectionFlags, SortOrder, SortSpec, Subtree,
    };
    pub use crate::ops::{EditorRegistry, NameableResolver};
    pub use crate::provider::{ListProvider, TableProvider, TableRef};
    pub use crate::settings::OutlineSettings;
    pub use crate::table::Table;
    pub use crate::undo::{EditorSession, UndoManager};
    pub use crate::workspace::Workspace;
}
