//! Undoable mutation helpers.
//!
//! Each helper follows the same pattern: snapshot the affected tables with
//! [`Workspace::prepare_edit`], mutate the records, resync, and push the edit
//! with [`Workspace::finalize_edit`]. Tables without an undo manager in
//! their window are mutated all the same.

use std::collections::{HashMap, HashSet};

use crate::drag::DropTarget;
use crate::error::{OutlineError, Result};
use crate::keys::TableId;
use crate::logging::targets;
use crate::model::{CloneContext, ItemVariant, Record, RecordId};
use crate::provider::TableProvider;
use crate::workspace::Workspace;

/// Undo name of [`Workspace::delete_selection`].
pub const DELETE_SELECTION_EDIT: &str = "Delete Selection";
/// Undo name of [`Workspace::duplicate_selection`].
pub const DUPLICATE_SELECTION_EDIT: &str = "Duplicate Selection";
/// Undo name of [`Workspace::process_nameables_for_selection`].
pub const NAME_SUBSTITUTION_EDIT: &str = "Name Substitution";

/// Undo name for inserting records of `kind`.
pub fn insert_edit_name(kind: &str) -> String {
    format!("Insert {kind}")
}

/// Undo name for adjusting raw points.
pub fn points_edit_name(increment: bool) -> &'static str {
    if increment {
        "Increment Points"
    } else {
        "Decrement Points"
    }
}

/// Tracks open record editors.
pub trait EditorRegistry {
    /// Closes every editor showing one of `ids`. Returning false vetoes the
    /// operation that asked, e.g. when an editor has unsaved changes the
    /// user chose to keep.
    fn close_editors(&mut self, ids: &HashSet<RecordId>) -> bool;
}

/// Supplies values for `@key@` placeholders.
pub trait NameableResolver {
    /// Fills in the values of `map`. Returning false cancels the
    /// substitution.
    fn resolve(&mut self, map: &mut HashMap<String, String>) -> bool;
}

impl<F> NameableResolver for F
where
    F: FnMut(&mut HashMap<String, String>) -> bool,
{
    fn resolve(&mut self, map: &mut HashMap<String, String>) -> bool {
        self(map)
    }
}

impl Workspace {
    /// Deletes the top-most selected rows of `table` with their children.
    ///
    /// Does nothing on a filtered table or without a selection. Open editors
    /// for the deleted records are closed first; if the registry vetoes,
    /// nothing is deleted. Returns the number of removed records.
    pub fn delete_selection(&mut self, table: TableId) -> Result<usize> {
        let window = self.window_of(table)?;
        let entry = self.entry_mut(table)?;
        if entry.table.is_filtered() || !entry.table.has_selection() {
            return Ok(0);
        }
        let ids = entry.table.selected_ids_deep();
        if let Some(editors) = self.editors.as_mut()
            && !editors.close_editors(&ids)
        {
            tracing::debug!(target: targets::WORKSPACE, ?table, "delete vetoed by open editor");
            return Ok(0);
        }
        let prepared = self.prepare_edit(DELETE_SELECTION_EDIT, window, &[table]);
        let removed = self.entry_mut(table)?.table.delete_selected();
        tracing::debug!(target: targets::WORKSPACE, ?table, removed, "selection deleted");
        self.finalize_edit(prepared);
        Ok(removed)
    }

    /// Duplicates the top-most selected rows, placing each clone right after
    /// its original and selecting the clones. Returns the number of clones.
    ///
    /// Like [`Workspace::delete_selection`], does nothing on a filtered table.
    pub fn duplicate_selection(&mut self, table: TableId) -> Result<usize> {
        let window = self.window_of(table)?;
        let source = self.table_ref(table)?;
        let entry = self.entry_mut(table)?;
        if entry.table.is_filtered() || !entry.table.has_selection() {
            return Ok(0);
        }
        let ctx = self.clone_context(source, table);
        let prepared = self.prepare_edit(DUPLICATE_SELECTION_EDIT, window, &[table]);
        let count = self.entry_mut(table)?.table.duplicate_selected(&ctx)?;
        tracing::debug!(target: targets::WORKSPACE, ?table, count, "selection duplicated");
        self.finalize_edit(prepared);
        Ok(count)
    }

    /// Inserts `records` at the insertion point of `table` and selects them.
    ///
    /// Returns the IDs of the inserted records.
    pub fn insert_records<P: TableProvider>(
        &mut self,
        table: TableId,
        records: Vec<P::Record>,
    ) -> Result<Vec<RecordId>> {
        let Some(kind) = records.first().map(|r| r.kind().to_string()) else {
            return Ok(Vec::new());
        };
        let window = self.window_of(table)?;
        self.try_table::<P>(table)?;
        let prepared = self.prepare_edit(insert_edit_name(&kind), window, &[table]);

        let t = self.try_table_mut::<P>(table)?;
        let DropTarget { parent, index } = t.insertion_point();
        let subtrees = records.into_iter().map(crate::model::Subtree::leaf).collect();
        let keys = t
            .provider_mut()
            .records_mut()
            .insert_subtrees(parent, index, subtrees)?;
        if let Some(parent) = parent {
            t.provider_mut().records_mut().set_open(parent, true);
        }
        t.select_keys(&keys);
        t.sync_to_model();
        let ids = t.selection().selected_ids().to_vec();
        tracing::debug!(target: targets::WORKSPACE, ?table, count = ids.len(), "records inserted");
        self.finalize_edit(prepared);
        Ok(ids)
    }

    /// Creates a new item of `variant` through the provider and inserts it.
    ///
    /// Returns `None` if the provider does not support the variant.
    pub fn create_item<P: TableProvider>(
        &mut self,
        table: TableId,
        variant: ItemVariant,
    ) -> Result<Option<RecordId>> {
        let document = self.table_ref(table)?.document;
        let ctx = CloneContext {
            source: document,
            owner: document,
        };
        let Some(record) = self.try_table::<P>(table)?.provider().create_item(variant, &ctx) else {
            return Ok(None);
        };
        Ok(self.insert_records::<P>(table, vec![record])?.into_iter().next())
    }

    /// Copies the selected rows of `source` to the end of `dest`'s root list
    /// with new IDs and selects the copies.
    ///
    /// Does nothing if `dest` is filtered. Returns the number of copied rows.
    pub fn copy_rows_to(&mut self, source: TableId, dest: TableId) -> Result<usize> {
        let source_ref = self.table_ref(source)?;
        let Some(payload) = self.entry_mut(source)?.table.capture_drag(source_ref) else {
            return Ok(0);
        };
        let window = self.window_of(dest)?;
        let entry = self.entry_mut(dest)?;
        if entry.table.is_filtered() {
            return Ok(0);
        }
        if !entry.table.accepts(&payload) {
            return Err(OutlineError::contract(format!(
                "table does not accept '{}' rows",
                payload.identity()
            )));
        }
        let ctx = self.clone_context(source_ref, dest);
        let prepared = self.prepare_edit(insert_edit_name(payload.kind()), window, &[dest]);
        let entry = self.entry_mut(dest)?;
        let inserted = entry
            .table
            .insert_payload(&payload, DropTarget::default(), false, &ctx)?;
        let ids = entry.table.finish_drop(&inserted);
        tracing::debug!(target: targets::WORKSPACE, ?source, ?dest, count = ids.len(), "rows copied");
        self.finalize_edit(prepared);
        Ok(ids.len())
    }

    /// Whether any selected leaf's raw points can move in the given
    /// direction. Decrementing requires points above zero.
    pub fn can_adjust_raw_points(&self, table: TableId, increment: bool) -> bool {
        self.tables
            .get(table)
            .is_some_and(|entry| entry.table.can_adjust_points(increment))
    }

    /// Adds or removes one raw point on every selected leaf that supports it.
    /// Returns the number of adjusted records.
    pub fn adjust_raw_points(&mut self, table: TableId, increment: bool) -> Result<usize> {
        if !self.can_adjust_raw_points(table, increment) {
            return Ok(0);
        }
        let window = self.window_of(table)?;
        let prepared = self.prepare_edit(points_edit_name(increment), window, &[table]);
        let adjusted = self.entry_mut(table)?.table.adjust_points(increment);
        tracing::debug!(target: targets::WORKSPACE, ?table, adjusted, increment, "raw points adjusted");
        self.finalize_edit(prepared);
        Ok(adjusted)
    }

    /// Replaces `@key@` placeholders in the selected records and their
    /// descendants with values from `resolver`.
    ///
    /// Returns false if there was nothing to substitute or the resolver
    /// cancelled.
    pub fn process_nameables_for_selection(
        &mut self,
        table: TableId,
        resolver: &mut dyn NameableResolver,
    ) -> Result<bool> {
        let window = self.window_of(table)?;
        let mut map = self.entry_mut(table)?.table.collect_nameables();
        if map.is_empty() || !resolver.resolve(&mut map) {
            return Ok(false);
        }
        let prepared = self.prepare_edit(NAME_SUBSTITUTION_EDIT, window, &[table]);
        let applied = self.entry_mut(table)?.table.apply_nameables(&map);
        tracing::debug!(target: targets::WORKSPACE, ?table, keys = map.len(), applied, "names substituted");
        self.finalize_edit(prepared);
        Ok(true)
    }
}
