//! Snapshot-based undo for table edits.
//!
//! Every undoable mutation captures each affected table before and after the
//! change as a [`TableSnapshot`]: the provider's serialized records plus the
//! open-row and selection ID sets. Undo restores the `before` snapshots,
//! redo the `after` ones.
//!
//! The flow through a [`Workspace`](crate::Workspace) is:
//!
//! 1. [`Workspace::prepare_edit`](crate::Workspace::prepare_edit) snapshots
//!    the tables (skipped when the window has no [`UndoManager`])
//! 2. the caller mutates the records and resyncs
//! 3. [`Workspace::finalize_edit`](crate::Workspace::finalize_edit) snapshots
//!    again and pushes an [`UndoEdit`]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use horizon_outline_core::Signal;

use crate::keys::{TableId, WindowId};
use crate::model::{Record, RecordId};

/// Default number of edits kept per window.
pub const DEFAULT_UNDO_LIMIT: usize = 200;

static NEXT_EDIT_ID: AtomicU64 = AtomicU64::new(1);

/// The state of one table at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub table: TableId,
    /// Serialized records, as produced by the provider.
    pub payload: Vec<u8>,
    /// IDs of expanded containers.
    pub open: HashSet<RecordId>,
    /// Selected IDs, in selection order.
    pub selection: Vec<RecordId>,
}

/// Before and after snapshots of one table.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub before: TableSnapshot,
    pub after: TableSnapshot,
}

/// A named, reversible change covering one or more tables.
#[derive(Debug, Clone)]
pub struct UndoEdit {
    id: u64,
    name: String,
    entries: Vec<UndoEntry>,
}

impl UndoEdit {
    /// Creates an edit from its entries.
    pub fn new(name: impl Into<String>, entries: Vec<UndoEntry>) -> Self {
        Self {
            id: NEXT_EDIT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            entries,
        }
    }

    /// Unique edit ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Human-readable edit name, e.g. "Delete Selection".
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-table snapshots.
    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }
}

/// A per-window undo stack.
///
/// # Signals
///
/// - `changed`: emitted whenever the stack or its position changes
pub struct UndoManager {
    /// Pushed edits, oldest first.
    edits: Vec<UndoEdit>,
    /// Number of edits currently applied.
    index: usize,
    /// Maximum number of edits kept.
    limit: usize,

    /// Emitted when the stack changes.
    pub changed: Signal<()>,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("len", &self.edits.len())
            .field("index", &self.index)
            .field("limit", &self.limit)
            .finish()
    }
}

impl UndoManager {
    /// Creates a stack keeping at most `limit` edits.
    pub fn new(limit: usize) -> Self {
        Self {
            edits: Vec::new(),
            index: 0,
            limit: limit.max(1),
            changed: Signal::new(),
        }
    }

    /// Maximum number of edits kept.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Changes the limit, dropping the oldest edits if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        if self.trim() {
            self.changed.emit(());
        }
    }

    /// Number of edits on the stack.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Returns true if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Pushes an edit, discarding anything that had been undone.
    pub fn push(&mut self, edit: UndoEdit) {
        // Remove any edits after the current position
        self.edits.truncate(self.index);
        self.edits.push(edit);
        self.index = self.edits.len();
        self.trim();
        self.changed.emit(());
    }

    /// Steps back, returning the edit to revert.
    pub fn undo(&mut self) -> Option<UndoEdit> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.changed.emit(());
        Some(self.edits[self.index].clone())
    }

    /// Steps forward, returning the edit to reapply.
    pub fn redo(&mut self) -> Option<UndoEdit> {
        let edit = self.edits.get(self.index)?.clone();
        self.index += 1;
        self.changed.emit(());
        Some(edit)
    }

    /// Returns true if there is an edit to undo.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Returns true if there is an edit to redo.
    pub fn can_redo(&self) -> bool {
        self.index < self.edits.len()
    }

    /// The edit [`undo`](Self::undo) would revert, without moving.
    pub fn next_undo(&self) -> Option<&UndoEdit> {
        self.index.checked_sub(1).and_then(|i| self.edits.get(i))
    }

    /// The edit [`redo`](Self::redo) would reapply, without moving.
    pub fn next_redo(&self) -> Option<&UndoEdit> {
        self.edits.get(self.index)
    }

    /// Name of the edit [`undo`](Self::undo) would revert.
    pub fn undo_name(&self) -> Option<&str> {
        self.next_undo().map(UndoEdit::name)
    }

    /// Name of the edit [`redo`](Self::redo) would reapply.
    pub fn redo_name(&self) -> Option<&str> {
        self.next_redo().map(UndoEdit::name)
    }

    /// Drops every edit.
    pub fn clear(&mut self) {
        self.edits.clear();
        self.index = 0;
        self.changed.emit(());
    }

    fn trim(&mut self) -> bool {
        let excess = self.edits.len().saturating_sub(self.limit);
        if excess == 0 {
            return false;
        }
        self.edits.drain(..excess);
        self.index = self.index.saturating_sub(excess);
        true
    }
}

/// Snapshots taken before a mutation, waiting for the after snapshots.
#[derive(Debug)]
#[must_use = "pass the prepared edit to Workspace::finalize_edit"]
pub struct PreparedEdit {
    pub(crate) name: String,
    pub(crate) window: WindowId,
    pub(crate) before: Vec<TableSnapshot>,
}

impl PreparedEdit {
    /// Name the edit will be pushed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables covered by the edit.
    pub fn tables(&self) -> impl Iterator<Item = TableId> + '_ {
        self.before.iter().map(|s| s.table)
    }
}

/// An in-place editor working on a draft copy of one record.
///
/// Changes accumulate on the draft and are committed as a single undo entry
/// by [`Workspace::apply_editor`](crate::Workspace::apply_editor). Dropping
/// the session discards them.
#[derive(Debug)]
pub struct EditorSession<R> {
    pub(crate) table: TableId,
    pub(crate) target: RecordId,
    pub(crate) draft: R,
    name: String,
}

impl<R: Record> EditorSession<R> {
    pub(crate) fn new(table: TableId, draft: R) -> Self {
        let name = format!("{} Changes", draft.kind());
        Self {
            table,
            target: draft.id().clone(),
            draft,
            name,
        }
    }

    /// The table holding the edited record.
    pub fn table(&self) -> TableId {
        self.table
    }

    /// ID of the edited record.
    pub fn target(&self) -> &RecordId {
        &self.target
    }

    /// The draft.
    pub fn draft(&self) -> &R {
        &self.draft
    }

    /// Mutable access to the draft.
    pub fn draft_mut(&mut self) -> &mut R {
        &mut self.draft
    }

    /// Name of the undo entry created on apply.
    pub fn edit_name(&self) -> &str {
        &self.name
    }

    /// Overrides the undo entry name.
    pub fn set_edit_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

static_assertions::assert_impl_all!(TableSnapshot: Send, Sync);
static_assertions::assert_impl_all!(UndoEdit: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use slotmap::SlotMap;

    use super::*;

    fn edit(name: &str) -> UndoEdit {
        let mut tables: SlotMap<TableId, ()> = SlotMap::with_key();
        let snapshot = TableSnapshot {
            table: tables.insert(()),
            payload: Vec::new(),
            open: HashSet::new(),
            selection: Vec::new(),
        };
        UndoEdit::new(
            name,
            vec![UndoEntry {
                before: snapshot.clone(),
                after: snapshot,
            }],
        )
    }

    #[test]
    fn test_undo_redo_positions() {
        let mut manager = UndoManager::default();
        assert!(!manager.can_undo());
        manager.push(edit("one"));
        manager.push(edit("two"));
        assert_eq!(manager.undo_name(), Some("two"));

        assert_eq!(manager.undo().unwrap().name(), "two");
        assert_eq!(manager.redo_name(), Some("two"));
        assert_eq!(manager.undo_name(), Some("one"));
        assert_eq!(manager.redo().unwrap().name(), "two");
        assert!(manager.redo().is_none());
    }

    #[test]
    fn test_peeking_does_not_move() {
        let mut manager = UndoManager::default();
        assert!(manager.next_undo().is_none());
        manager.push(edit("one"));
        assert_eq!(manager.next_undo().map(UndoEdit::name), Some("one"));
        assert!(manager.can_undo());
        assert!(manager.next_redo().is_none());

        manager.undo();
        assert_eq!(manager.next_redo().map(UndoEdit::name), Some("one"));
        assert!(manager.can_redo());
    }

    #[test]
    fn test_push_discards_redo() {
        let mut manager = UndoManager::default();
        manager.push(edit("one"));
        manager.push(edit("two"));
        manager.undo();
        manager.push(edit("three"));
        assert!(!manager.can_redo());
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.undo_name(), Some("three"));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut manager = UndoManager::new(2);
        for name in ["one", "two", "three"] {
            manager.push(edit(name));
        }
        assert_eq!(manager.len(), 2);
        manager.undo();
        manager.undo();
        assert!(!manager.can_undo());
        assert_eq!(manager.redo_name(), Some("two"));

        manager.set_limit(1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_changed_signal() {
        let mut manager = UndoManager::default();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        manager.changed.connect(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        manager.push(edit("one"));
        manager.undo();
        manager.undo();
        manager.clear();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
