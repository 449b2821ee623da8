//! Records, the record arena and the row projection built on top of it.
//!
//! # Architecture
//!
//! - [`Record`]: the capability contract domain types implement
//! - [`RecordTree`]: owns every record of a table, keyed by [`RecordKey`]
//! - [`NodeTree`]: lazy per-table projection of records into rows, with a
//!   [`CellCache`] per cell
//! - [`Filter`]: row visibility from a query and required tags
//! - [`RowSelection`]: selected rows, tracked by [`RecordId`]

mod cell;
pub mod filter;
pub mod nameables;
mod node;
mod record;
mod render;
mod selection;
pub mod sort;
mod tree;

pub use cell::{Alignment, CellData, CellType, ColumnId};
pub use filter::Filter;
pub use node::{NodeKey, NodeTree, SortSpec, VisibleRow};
pub use record::{CloneContext, ItemVariant, Record, RecordId};
pub use render::{CellCache, CellRenderer, RenderedCell, TextCellRenderer};
pub use selection::{RowSelection, SelectionFlags, SelectionMode};
pub use sort::SortOrder;
pub use tree::{RecordKey, RecordTree, Subtree};
