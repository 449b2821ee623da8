//! Drag payloads and drop validation.
//!
//! Starting a drag deep-clones the selected rows into a [`DragPayload`], so
//! the payload stays valid no matter what happens to the source table while
//! the drag is in flight. The payload is type-erased; a destination gets the
//! records back with [`DragPayload::records`] for its own record type.

use std::any::Any;
use std::rc::Rc;

use crate::model::{CloneContext, Record, RecordId, RecordKey, Subtree};
use crate::provider::TableRef;

/// Why a drop was refused. Every rejection happens before any change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DropRejection {
    /// The payload's identity differs from the destination's.
    #[error("payload identity does not match the destination")]
    IdentityMismatch,
    /// The destination is filtered.
    #[error("destination is filtered")]
    Filtered,
    /// A row would be moved underneath itself.
    #[error("a row cannot be dropped into its own subtree")]
    IntoOwnSubtree,
    /// The source table of a move is gone.
    #[error("source table is no longer open")]
    SourceGone,
    /// A cross-table move would record undo for the source but the
    /// destination window has no undo manager.
    #[error("destination window has no undo manager")]
    NoUndoManager,
    /// The drop target row does not exist or cannot hold children.
    #[error("invalid drop target")]
    InvalidTarget,
}

struct DraggedRows<R> {
    subtrees: Vec<Subtree<R>>,
    source_keys: Vec<RecordKey>,
}

/// Rows captured at drag start.
#[derive(Clone)]
pub struct DragPayload {
    identity: String,
    source: TableRef,
    count: usize,
    kind: String,
    preview: String,
    rows: Rc<dyn Any>,
}

impl std::fmt::Debug for DragPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragPayload")
            .field("identity", &self.identity)
            .field("source", &self.source)
            .field("count", &self.count)
            .field("kind", &self.kind)
            .field("preview", &self.preview)
            .finish()
    }
}

impl DragPayload {
    /// Captures `subtrees` (deep clones of the rows at `source_keys`).
    pub fn new<R: Record>(
        identity: impl Into<String>,
        source: TableRef,
        source_keys: Vec<RecordKey>,
        subtrees: Vec<Subtree<R>>,
        plural: &str,
    ) -> Self {
        let count = subtrees.len();
        let kind = subtrees
            .first()
            .map(|s| s.record.kind().to_string())
            .unwrap_or_default();
        let preview = match subtrees.as_slice() {
            [single] => single.record.title(),
            _ => format!("{count} {plural}"),
        };
        Self {
            identity: identity.into(),
            source,
            count,
            kind,
            preview,
            rows: Rc::new(DraggedRows {
                subtrees,
                source_keys,
            }),
        }
    }

    /// Drag identity of the source table.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The table (and document) the rows came from.
    pub fn source(&self) -> TableRef {
        self.source
    }

    /// Number of top-level rows.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Record kind of the first dragged row.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Short description for the drag cursor.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    /// Returns true if the payload holds records of type `R`.
    pub fn holds<R: Record>(&self) -> bool {
        self.rows.is::<DraggedRows<R>>()
    }

    /// Fresh clones of the dragged subtrees, or `None` for another record type.
    pub fn records<R: Record>(&self, ctx: &CloneContext, preserve_id: bool) -> Option<Vec<Subtree<R>>> {
        let rows = self.rows.downcast_ref::<DraggedRows<R>>()?;
        Some(
            rows.subtrees
                .iter()
                .map(|subtree| subtree.duplicate(ctx, preserve_id))
                .collect(),
        )
    }

    /// IDs of the dragged top-level rows.
    pub fn record_ids<R: Record>(&self) -> Option<Vec<RecordId>> {
        let rows = self.rows.downcast_ref::<DraggedRows<R>>()?;
        Some(rows.subtrees.iter().map(|s| s.record.id().clone()).collect())
    }

    /// Keys of the dragged rows in the source table.
    pub fn source_keys<R: Record>(&self) -> Option<&[RecordKey]> {
        self.rows
            .downcast_ref::<DraggedRows<R>>()
            .map(|rows| rows.source_keys.as_slice())
    }
}

/// Where dropped rows go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropTarget {
    /// Parent container, or `None` for the root list.
    pub parent: Option<RecordKey>,
    /// Position within the parent's list; `None` appends.
    pub index: Option<usize>,
}

impl DropTarget {
    /// Drop into the root list at `index`.
    pub fn root(index: usize) -> Self {
        Self {
            parent: None,
            index: Some(index),
        }
    }

    /// Append to the children of `parent`.
    pub fn into_container(parent: RecordKey) -> Self {
        Self {
            parent: Some(parent),
            index: None,
        }
    }
}

/// What a successful drop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    /// True if rows were moved, false if copied.
    pub moved: bool,
    /// IDs of the inserted top-level rows.
    pub inserted: Vec<RecordId>,
}

// Payloads stay on the UI thread with the tables they came from.
static_assertions::assert_not_impl_any!(DragPayload: Send, Sync);

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::keys::TableId;
    use crate::testing::{Modifier, Trait, trait_tree};

    fn table_ref() -> TableRef {
        let mut tables: SlotMap<TableId, ()> = SlotMap::with_key();
        TableRef {
            table: tables.insert(()),
            document: None,
        }
    }

    #[test]
    fn test_payload_preview() {
        let (tree, keys) = trait_tree();
        let ctx = CloneContext::default();
        let one = vec![tree.clone_subtree(keys.leaf, &ctx, true).unwrap()];
        let payload = DragPayload::new("trait", table_ref(), vec![keys.leaf], one, "Traits");
        assert_eq!(payload.preview(), "Fit");

        let two: Vec<Subtree<Trait>> = [keys.leaf, keys.container]
            .iter()
            .map(|&k| tree.clone_subtree(k, &ctx, true).unwrap())
            .collect();
        let payload = DragPayload::new("trait", table_ref(), vec![keys.leaf, keys.container], two, "Traits");
        assert_eq!(payload.preview(), "2 Traits");
        assert_eq!(payload.count(), 2);
    }

    #[test]
    fn test_payload_is_type_checked() {
        let (tree, keys) = trait_tree();
        let ctx = CloneContext::default();
        let rows = vec![tree.clone_subtree(keys.container, &ctx, true).unwrap()];
        let payload = DragPayload::new("trait", table_ref(), vec![keys.container], rows, "Traits");
        assert!(payload.holds::<Trait>());
        assert!(payload.records::<Modifier>(&ctx, true).is_none());

        let fresh = payload.records::<Trait>(&ctx, false).unwrap();
        assert_eq!(fresh[0].count(), 3);
        assert_ne!(fresh[0].record.id(), tree.get(keys.container).unwrap().id());
        let same = payload.records::<Trait>(&ctx, true).unwrap();
        assert_eq!(same[0].record.id(), tree.get(keys.container).unwrap().id());
    }
}
