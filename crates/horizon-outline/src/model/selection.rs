//! Row selection tracked by record ID.
//!
//! Selection is kept as record IDs rather than row positions so it survives
//! resyncs, sorting, filtering and undo/redo. IDs that no longer exist after
//! a restore are dropped without complaint.
//!
//! # Example
//!
//! ```
//! use horizon_outline::model::{RecordId, RowSelection, SelectionFlags};
//!
//! let mut selection = RowSelection::new();
//! selection.selection_changed.connect(|(selected, deselected)| {
//!     println!("+{} -{}", selected.len(), deselected.len());
//! });
//! selection.select(RecordId::new("t1"), SelectionFlags::CLEAR_AND_SELECT);
//! assert!(selection.is_selected(&RecordId::new("t1")));
//! ```

use std::collections::HashSet;

use horizon_outline_core::Signal;

use super::record::RecordId;

/// How many rows may be selected at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Nothing can be selected.
    NoSelection,
    /// At most one row.
    SingleSelection,
    /// Any number of rows.
    #[default]
    MultiSelection,
}

/// Flags controlling a selection operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionFlags {
    /// Clear the existing selection first.
    pub clear: bool,
    /// Select the given rows.
    pub select: bool,
    /// Deselect the given rows.
    pub deselect: bool,
    /// Toggle the given rows.
    pub toggle: bool,
}

impl SelectionFlags {
    /// Clear existing selection.
    pub const CLEAR: Self = Self {
        clear: true,
        ..Self::empty()
    };

    /// Add to the selection.
    pub const SELECT: Self = Self {
        select: true,
        ..Self::empty()
    };

    /// Remove from the selection.
    pub const DESELECT: Self = Self {
        deselect: true,
        ..Self::empty()
    };

    /// Flip selection state.
    pub const TOGGLE: Self = Self {
        toggle: true,
        ..Self::empty()
    };

    /// Replace the selection.
    pub const CLEAR_AND_SELECT: Self = Self {
        clear: true,
        select: true,
        ..Self::empty()
    };

    const fn empty() -> Self {
        Self {
            clear: false,
            select: false,
            deselect: false,
            toggle: false,
        }
    }
}

/// The selected rows of one table.
///
/// # Signals
///
/// - `selection_changed`: emitted with (selected, deselected) IDs
pub struct RowSelection {
    mode: SelectionMode,

    /// Set of selected IDs for O(1) lookup.
    selected_ids: HashSet<RecordId>,

    /// Selected IDs in the order they were selected.
    selected_order: Vec<RecordId>,

    /// Emitted when selection changes. Args: (selected, deselected)
    pub selection_changed: Signal<(Vec<RecordId>, Vec<RecordId>)>,
}

impl Default for RowSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RowSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSelection")
            .field("mode", &self.mode)
            .field("selected", &self.selected_order)
            .finish()
    }
}

impl RowSelection {
    /// Creates an empty multi-row selection.
    pub fn new() -> Self {
        Self {
            mode: SelectionMode::default(),
            selected_ids: HashSet::new(),
            selected_order: Vec::new(),
            selection_changed: Signal::new(),
        }
    }

    /// Gets the selection mode.
    pub fn selection_mode(&self) -> SelectionMode {
        self.mode
    }

    /// Sets the selection mode. Excess selected rows are dropped.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
        let keep = match mode {
            SelectionMode::NoSelection => 0,
            SelectionMode::SingleSelection => 1,
            SelectionMode::MultiSelection => usize::MAX,
        };
        if self.selected_order.len() > keep {
            let dropped = self.selected_order.split_off(keep);
            for id in &dropped {
                self.selected_ids.remove(id);
            }
            self.selection_changed.emit((Vec::new(), dropped));
        }
    }

    /// Checks if a row is selected.
    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected_ids.contains(id)
    }

    /// Returns true if any row is selected.
    pub fn has_selection(&self) -> bool {
        !self.selected_order.is_empty()
    }

    /// Number of selected rows.
    pub fn selected_count(&self) -> usize {
        self.selected_order.len()
    }

    /// Selected IDs in selection order.
    pub fn selected_ids(&self) -> &[RecordId] {
        &self.selected_order
    }

    /// Selected IDs as a set.
    pub fn id_set(&self) -> &HashSet<RecordId> {
        &self.selected_ids
    }

    /// Applies `flags` to a single row.
    pub fn select(&mut self, id: RecordId, flags: SelectionFlags) {
        self.select_all(vec![id], flags);
    }

    /// Applies `flags` to several rows at once, emitting a single change.
    pub fn select_all(&mut self, ids: Vec<RecordId>, flags: SelectionFlags) {
        if self.mode == SelectionMode::NoSelection {
            return;
        }
        let mut selected = Vec::new();
        let mut deselected = Vec::new();

        if flags.clear {
            let keep: HashSet<&RecordId> = if flags.select {
                ids.iter().collect()
            } else {
                HashSet::new()
            };
            let (kept, dropped): (Vec<RecordId>, Vec<RecordId>) = std::mem::take(&mut self.selected_order)
                .into_iter()
                .partition(|id| keep.contains(id));
            for id in &dropped {
                self.selected_ids.remove(id);
            }
            self.selected_order = kept;
            deselected.extend(dropped);
        }

        for id in ids {
            let currently = self.selected_ids.contains(&id);
            let want = if flags.toggle {
                !currently
            } else if flags.deselect {
                false
            } else {
                flags.select || currently
            };
            if want && !currently {
                if self.mode == SelectionMode::SingleSelection {
                    for old in self.selected_order.drain(..) {
                        self.selected_ids.remove(&old);
                        deselected.push(old);
                    }
                }
                self.selected_ids.insert(id.clone());
                self.selected_order.push(id.clone());
                selected.push(id);
            } else if !want && currently {
                self.selected_ids.remove(&id);
                self.selected_order.retain(|s| *s != id);
                deselected.push(id);
            }
        }

        if !selected.is_empty() || !deselected.is_empty() {
            self.selection_changed.emit((selected, deselected));
        }
    }

    /// Replaces the selection with `ids`.
    pub fn set_selection(&mut self, ids: Vec<RecordId>) {
        self.select_all(ids, SelectionFlags::CLEAR_AND_SELECT);
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.select_all(Vec::new(), SelectionFlags::CLEAR);
    }

    /// Drops selected IDs for which `exists` returns false.
    pub fn retain_existing(&mut self, exists: impl Fn(&RecordId) -> bool) {
        let (kept, dropped): (Vec<RecordId>, Vec<RecordId>) = std::mem::take(&mut self.selected_order)
            .into_iter()
            .partition(|id| exists(id));
        for id in &dropped {
            self.selected_ids.remove(id);
        }
        self.selected_order = kept;
        if !dropped.is_empty() {
            self.selection_changed.emit((Vec::new(), dropped));
        }
    }
}
