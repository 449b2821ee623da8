//! A table: one provider's records projected into rows.
//!
//! [`Table`] ties a [`TableProvider`] to its [`NodeTree`] projection, its
//! selection, filter, render cache settings and column widths. After any
//! change to the provider's records, call [`Table::sync_to_model`] to rebuild
//! the projection and notify listeners through `rows_changed`.

use std::collections::HashSet;
use std::sync::Arc;

use horizon_outline_core::Signal;

use crate::codec;
use crate::columns::ColumnWidths;
use crate::drag::DropTarget;
use crate::error::Result;
use crate::keys::TableId;
use crate::logging::{PerfSpan, targets};
use crate::model::{
    ColumnId, Filter, NodeKey, NodeTree, Record, RecordId, RecordKey, RecordTree, RenderedCell,
    RowSelection, SelectionFlags, SortSpec, TextCellRenderer, VisibleRow,
};
use crate::provider::TableProvider;
use crate::settings::OutlineSettings;
use crate::undo::TableSnapshot;

/// A provider together with its row projection and UI state.
///
/// # Signals
///
/// - `rows_changed`: emitted after every resync
/// - `modified_changed`: emitted with the new state when the records start
///   or stop differing from the last saved state
/// - `selection().selection_changed`: see [`RowSelection`]
pub struct Table<P: TableProvider> {
    provider: P,
    nodes: NodeTree,
    selection: RowSelection,
    filter: Option<Filter>,
    visible: Option<HashSet<RecordKey>>,
    renderer: TextCellRenderer,
    widths: ColumnWidths,
    max_auto_width: f32,
    names_only: bool,
    saved_checksum: Option<u32>,
    modified: bool,

    /// Emitted after the projection was rebuilt.
    pub rows_changed: Signal<()>,

    /// Emitted when the modified state flips.
    pub modified_changed: Signal<bool>,
}

impl<P: TableProvider> std::fmt::Debug for Table<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("records", self.provider.records())
            .field("nodes", &self.nodes)
            .field("selection", &self.selection)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<P: TableProvider> Table<P> {
    /// Creates a table over `provider` and builds its root rows.
    pub fn new(provider: P, settings: &OutlineSettings) -> Self {
        let columns = provider.column_ids();
        let mut table = Self {
            nodes: NodeTree::new(columns, settings.group_containers_on_sort),
            provider,
            selection: RowSelection::new(),
            filter: None,
            visible: None,
            renderer: TextCellRenderer::new(settings.render.grapheme_advance),
            widths: ColumnWidths::new(),
            max_auto_width: settings.maximum_auto_column_width,
            names_only: settings.filter_names_only,
            saved_checksum: None,
            modified: false,
            rows_changed: Signal::new(),
            modified_changed: Signal::new(),
        };
        table.sync_to_model();
        table
    }

    /// The provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable access to the provider. Call [`sync_to_model`](Self::sync_to_model)
    /// after changing records.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// The provider's records.
    pub fn records(&self) -> &RecordTree<P::Record> {
        self.provider.records()
    }

    /// The row projection.
    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    /// The selection.
    pub fn selection(&self) -> &RowSelection {
        &self.selection
    }

    /// Mutable access to the selection.
    pub fn selection_mut(&mut self) -> &mut RowSelection {
        &mut self.selection
    }

    /// Rebuilds the projection from the records, reapplies the filter, drops
    /// selected IDs that no longer exist and notifies listeners.
    pub fn sync_to_model(&mut self) {
        let _perf = PerfSpan::new("table_sync");
        let records = self.provider.records();
        self.nodes.sync(records);
        if let Some(filter) = &self.filter {
            self.visible = Some(filter.visible_set(
                records,
                self.nodes.columns(),
                self.provider.hierarchy_column(),
            ));
        }
        self.selection
            .retain_existing(|id| records.key_of(id).is_some());
        tracing::debug!(
            target: targets::TABLE,
            records = records.len(),
            roots = records.roots().len(),
            "table synced"
        );
        self.update_modified();
        self.rows_changed.emit(());
    }

    /// Rows in display order.
    pub fn rows(&mut self) -> Vec<VisibleRow> {
        self.nodes
            .visible_rows(self.provider.records(), self.visible.as_ref())
    }

    /// Display index of the row showing `id`.
    pub fn find_row_index_by_id(&mut self, id: &RecordId) -> Option<usize> {
        let key = self.records().key_of(id)?;
        self.rows().iter().position(|row| row.record == key)
    }

    /// The first selected row in display order.
    pub fn first_selected_row(&mut self) -> Option<RecordKey> {
        if !self.selection.has_selection() {
            return None;
        }
        let rows = self.rows();
        let records = self.provider.records();
        rows.iter()
            .map(|row| row.record)
            .find(|&key| {
                records
                    .get(key)
                    .is_some_and(|r| self.selection.is_selected(r.id()))
            })
            .or_else(|| self.selected_keys().first().copied())
    }

    /// Where new rows go: into the first selected row if it is a container,
    /// after it otherwise, or at the end of the root list with no selection.
    pub fn insertion_point(&mut self) -> DropTarget {
        let Some(target) = self.first_selected_row() else {
            return DropTarget::default();
        };
        let records = self.provider.records();
        if records.get(target).is_some_and(Record::is_container) {
            return DropTarget::into_container(target);
        }
        DropTarget {
            parent: records.parent(target),
            index: records.row_of(target).map(|row| row + 1),
        }
    }

    /// Keys of the selected records, in record order.
    pub fn selected_keys(&self) -> Vec<RecordKey> {
        let records = self.provider.records();
        records
            .preorder()
            .into_iter()
            .filter(|&key| {
                records
                    .get(key)
                    .is_some_and(|r| self.selection.is_selected(r.id()))
            })
            .collect()
    }

    /// Selected records with no selected ancestor.
    pub fn selected_top_most(&self) -> Vec<RecordKey> {
        self.provider.records().top_most(&self.selected_keys())
    }

    /// Replaces the selection with the records at `keys`.
    pub fn select_keys(&mut self, keys: &[RecordKey]) {
        let records = self.provider.records();
        let ids = keys
            .iter()
            .filter_map(|&key| records.get(key).map(|r| r.id().clone()))
            .collect();
        self.selection.select_all(ids, SelectionFlags::CLEAR_AND_SELECT);
    }

    /// Opens every container if any is closed, otherwise closes them all.
    pub fn toggle_hierarchy(&mut self) {
        let records = self.provider.records();
        let containers: Vec<RecordKey> = records
            .iter()
            .filter(|(_, record)| record.is_container())
            .map(|(key, _)| key)
            .collect();
        let open = containers.iter().any(|&key| !records.is_open(key));
        let records = self.provider.records_mut();
        for key in containers {
            records.set_open(key, open);
        }
        self.sync_to_model();
    }

    /// Filters rows. An empty filter clears it.
    pub fn apply_filter(&mut self, filter: Filter) {
        if filter.is_empty() {
            self.clear_filter();
            return;
        }
        self.filter = Some(filter);
        self.sync_to_model();
    }

    /// Filters by query and tags using the table's names-only setting.
    pub fn filter_by(&mut self, query: &str, tags: Vec<String>) {
        self.apply_filter(Filter::new(query, tags).with_names_only(self.names_only));
    }

    /// Removes the filter, showing every row again.
    pub fn clear_filter(&mut self) {
        if self.filter.take().is_some() {
            self.visible = None;
            self.sync_to_model();
        }
    }

    /// Returns true while a filter is applied.
    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// The current filter.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Sorts rows by a column, or restores record order for `None`.
    pub fn sort_by(&mut self, sort: Option<SortSpec>) {
        self.nodes.sort_by(self.provider.records(), sort);
        self.rows_changed.emit(());
    }

    /// The rendering of `column` for `node` at `width`.
    pub fn cell_at(&mut self, node: NodeKey, column: ColumnId, width: f32) -> Option<Arc<RenderedCell>> {
        self.nodes
            .cell_at(self.provider.records(), node, column, width, &self.renderer)
    }

    /// Stored column widths.
    pub fn column_widths(&self) -> &ColumnWidths {
        &self.widths
    }

    /// Replaces the column widths, dropping unknown columns.
    pub fn set_column_widths(&mut self, mut widths: ColumnWidths) {
        widths.retain_columns(self.nodes.columns());
        self.widths = widths;
    }

    /// Sets the width of one column.
    pub fn set_column_width(&mut self, column: ColumnId, width: f32) {
        if self.nodes.columns().contains(&column) {
            self.widths.set(column, width);
        }
    }

    /// Gives spare horizontal space to the excess-width column, up to the
    /// configured maximum auto width.
    pub fn fit_columns(&mut self, available: f32) -> bool {
        self.widths.fit_with_excess(
            self.nodes.columns(),
            self.provider.excess_width_column(),
            available,
            self.max_auto_width,
        )
    }

    /// Captures the table's state for undo.
    pub fn snapshot(&self, table: TableId) -> Result<TableSnapshot> {
        Ok(TableSnapshot {
            table,
            payload: self.provider.serialize()?,
            open: self.provider.records().open_ids(),
            selection: self.selection.selected_ids().to_vec(),
        })
    }

    /// Restores a snapshot, resyncing and reselecting.
    pub fn restore(&mut self, snapshot: &TableSnapshot) -> Result<()> {
        self.provider.deserialize(&snapshot.payload)?;
        self.provider.records_mut().apply_open_ids(&snapshot.open);
        self.selection.set_selection(snapshot.selection.clone());
        self.sync_to_model();
        Ok(())
    }

    /// Returns true if the records differ from the last saved state.
    ///
    /// A table that was never marked saved is unmodified until it changes
    /// for the first time after creation.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Records the current state as saved.
    pub fn mark_saved(&mut self) -> Result<()> {
        self.saved_checksum = Some(codec::checksum(&self.provider.serialize()?));
        self.set_modified(false);
        Ok(())
    }

    fn update_modified(&mut self) {
        let checksum = match self.provider.serialize() {
            Ok(data) => codec::checksum(&data),
            Err(err) => {
                tracing::warn!(target: targets::TABLE, error = %err, "could not checksum records");
                return;
            }
        };
        match self.saved_checksum {
            None => self.saved_checksum = Some(checksum),
            Some(saved) => self.set_modified(saved != checksum),
        }
    }

    fn set_modified(&mut self, modified: bool) {
        if self.modified != modified {
            self.modified = modified;
            self.modified_changed.emit(modified);
        }
    }
}
