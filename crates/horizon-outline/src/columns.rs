//! Persisted column widths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ColumnId;

/// Column widths keyed by [`ColumnId`].
///
/// Widths survive column reordering and are serialized with the owning
/// table's layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnWidths {
    widths: BTreeMap<ColumnId, f32>,
}

impl ColumnWidths {
    /// Creates an empty set of widths.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored width of `column`.
    pub fn get(&self, column: ColumnId) -> Option<f32> {
        self.widths.get(&column).copied()
    }

    /// Stores the width of `column`. Negative widths are clamped to zero.
    pub fn set(&mut self, column: ColumnId, width: f32) {
        self.widths.insert(column, width.max(0.0));
    }

    /// Number of stored widths.
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Drops widths for columns not in `columns`.
    pub fn retain_columns(&mut self, columns: &[ColumnId]) {
        self.widths.retain(|id, _| columns.contains(id));
    }

    /// Sum of the stored widths of `columns`.
    pub fn total(&self, columns: &[ColumnId]) -> f32 {
        columns.iter().filter_map(|&c| self.get(c)).sum()
    }

    /// Widens `excess` so that `columns` fill `available`, but never past
    /// `maximum`.
    ///
    /// Nothing changes if the columns already fill the space, `excess` is
    /// not one of them, or it is already at least `maximum` wide. Returns
    /// true if a width changed.
    pub fn fit_with_excess(
        &mut self,
        columns: &[ColumnId],
        excess: Option<ColumnId>,
        available: f32,
        maximum: f32,
    ) -> bool {
        let Some(excess) = excess.filter(|c| columns.contains(c)) else {
            return false;
        };
        let spare = available - self.total(columns);
        if spare <= 0.0 {
            return false;
        }
        let current = self.get(excess).unwrap_or(0.0);
        let fitted = (current + spare).min(maximum);
        if fitted <= current {
            return false;
        }
        self.set(excess, fitted);
        true
    }
}
