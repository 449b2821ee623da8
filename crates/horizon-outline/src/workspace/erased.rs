//! Type-erased access to tables of any provider type.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use crate::drag::{DragPayload, DropTarget};
use crate::error::{OutlineError, Result};
use crate::keys::TableId;
use crate::model::{CloneContext, Record, RecordId, RecordKey, Subtree};
use crate::provider::{TableProvider, TableRef};
use crate::table::Table;
use crate::undo::TableSnapshot;

/// The operations a [`Workspace`](super::Workspace) runs on a table without
/// knowing its provider type.
pub(crate) trait AnyTable {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn provider_type(&self) -> &'static str;

    fn snapshot(&self, id: TableId) -> Result<TableSnapshot>;
    fn restore(&mut self, snapshot: &TableSnapshot) -> Result<()>;
    fn sync(&mut self);
    fn contains(&self, key: RecordKey) -> bool;
    fn is_filtered(&self) -> bool;
    fn has_selection(&self) -> bool;

    fn drag_identity(&self) -> &str;
    fn alt_drop_identity(&self) -> Option<&str>;
    fn drop_should_move(&self, from: TableRef, to: TableRef) -> bool;
    fn accepts(&self, payload: &DragPayload) -> bool;
    fn capture_drag(&mut self, source: TableRef) -> Option<DragPayload>;
    fn insertion_point(&mut self) -> DropTarget;
    fn is_valid_target(&self, target: DropTarget) -> bool;
    fn keys_for(&self, payload: &DragPayload) -> Option<Vec<RecordKey>>;
    fn would_nest(&self, keys: &[RecordKey], target: DropTarget) -> bool;
    fn move_rows(&mut self, keys: &[RecordKey], target: DropTarget) -> Result<Vec<RecordKey>>;
    fn insert_payload(
        &mut self,
        payload: &DragPayload,
        target: DropTarget,
        preserve_id: bool,
        ctx: &CloneContext,
    ) -> Result<Vec<RecordKey>>;
    fn remove_payload_rows(&mut self, payload: &DragPayload) -> usize;
    fn finish_drop(&mut self, inserted: &[RecordKey]) -> Vec<RecordId>;
    fn alt_drop(&mut self, row: RecordKey, payload: &DragPayload, ctx: &CloneContext) -> Result<bool>;

    fn selected_ids_deep(&self) -> HashSet<RecordId>;
    fn delete_selected(&mut self) -> usize;
    fn duplicate_selected(&mut self, ctx: &CloneContext) -> Result<usize>;
    fn can_adjust_points(&self, increment: bool) -> bool;
    fn adjust_points(&mut self, increment: bool) -> usize;
    fn collect_nameables(&mut self) -> HashMap<String, String>;
    fn apply_nameables(&mut self, map: &HashMap<String, String>) -> usize;
}

impl<P: TableProvider> Table<P> {
    fn selected_leaves(&self) -> Vec<RecordKey> {
        let records = self.records();
        self.selected_keys()
            .into_iter()
            .filter(|&key| records.get(key).is_some_and(|r| !r.is_container()))
            .collect()
    }

    fn selected_subtree_keys(&self) -> Vec<RecordKey> {
        let records = self.records();
        let tops = self.selected_top_most();
        records
            .preorder()
            .into_iter()
            .filter(|&key| tops.iter().any(|&top| records.is_within(key, top)))
            .collect()
    }
}

impl<P: TableProvider> AnyTable for Table<P> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn provider_type(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn snapshot(&self, id: TableId) -> Result<TableSnapshot> {
        Table::snapshot(self, id)
    }

    fn restore(&mut self, snapshot: &TableSnapshot) -> Result<()> {
        Table::restore(self, snapshot)
    }

    fn sync(&mut self) {
        self.sync_to_model();
    }

    fn contains(&self, key: RecordKey) -> bool {
        self.records().contains(key)
    }

    fn is_filtered(&self) -> bool {
        Table::is_filtered(self)
    }

    fn has_selection(&self) -> bool {
        self.selection().has_selection()
    }

    fn drag_identity(&self) -> &str {
        self.provider().drag_identity()
    }

    fn alt_drop_identity(&self) -> Option<&str> {
        self.provider().alt_drop_identity()
    }

    fn drop_should_move(&self, from: TableRef, to: TableRef) -> bool {
        self.provider().drop_should_move(from, to)
    }

    fn accepts(&self, payload: &DragPayload) -> bool {
        payload.identity() == self.provider().drag_identity() && payload.holds::<P::Record>()
    }

    fn capture_drag(&mut self, source: TableRef) -> Option<DragPayload> {
        let keys = self.selected_top_most();
        if keys.is_empty() {
            return None;
        }
        let ctx = CloneContext {
            source: source.document,
            owner: source.document,
        };
        let records = self.records();
        let subtrees: Vec<Subtree<P::Record>> = keys
            .iter()
            .filter_map(|&key| records.clone_subtree(key, &ctx, true))
            .collect();
        let (_, plural) = self.provider().item_names();
        Some(DragPayload::new(
            self.provider().drag_identity(),
            source,
            keys,
            subtrees,
            plural,
        ))
    }

    fn insertion_point(&mut self) -> DropTarget {
        Table::insertion_point(self)
    }

    fn is_valid_target(&self, target: DropTarget) -> bool {
        match target.parent {
            None => true,
            Some(parent) => self.records().get(parent).is_some_and(Record::is_container),
        }
    }

    fn keys_for(&self, payload: &DragPayload) -> Option<Vec<RecordKey>> {
        let records = self.records();
        payload
            .record_ids::<P::Record>()?
            .iter()
            .map(|id| records.key_of(id))
            .collect()
    }

    fn would_nest(&self, keys: &[RecordKey], target: DropTarget) -> bool {
        let records = self.records();
        target
            .parent
            .is_some_and(|parent| keys.iter().any(|&key| records.is_within(parent, key)))
    }

    fn move_rows(&mut self, keys: &[RecordKey], target: DropTarget) -> Result<Vec<RecordKey>> {
        self.provider_mut()
            .records_mut()
            .move_to(keys, target.parent, target.index)
    }

    fn insert_payload(
        &mut self,
        payload: &DragPayload,
        target: DropTarget,
        preserve_id: bool,
        ctx: &CloneContext,
    ) -> Result<Vec<RecordKey>> {
        let subtrees = payload
            .records::<P::Record>(ctx, preserve_id)
            .ok_or_else(|| OutlineError::contract("payload holds another record type"))?;
        self.provider_mut()
            .records_mut()
            .insert_subtrees(target.parent, target.index, subtrees)
    }

    fn remove_payload_rows(&mut self, payload: &DragPayload) -> usize {
        let Some(ids) = payload.record_ids::<P::Record>() else {
            return 0;
        };
        let records = self.provider_mut().records_mut();
        let keys: Vec<RecordKey> = ids.iter().filter_map(|id| records.key_of(id)).collect();
        records
            .top_most(&keys)
            .into_iter()
            .filter_map(|key| records.remove(key))
            .count()
    }

    fn finish_drop(&mut self, inserted: &[RecordKey]) -> Vec<RecordId> {
        self.provider_mut().process_drop(inserted);
        let records = self.records();
        let ids: Vec<RecordId> = inserted
            .iter()
            .filter_map(|&key| records.get(key).map(|r| r.id().clone()))
            .collect();
        self.selection_mut().set_selection(ids.clone());
        self.sync_to_model();
        ids
    }

    fn alt_drop(&mut self, row: RecordKey, payload: &DragPayload, ctx: &CloneContext) -> Result<bool> {
        let changed = self.provider_mut().alt_drop(row, payload, ctx)?;
        if changed {
            self.sync_to_model();
        }
        Ok(changed)
    }

    fn selected_ids_deep(&self) -> HashSet<RecordId> {
        let records = self.records();
        self.selected_subtree_keys()
            .into_iter()
            .filter_map(|key| records.get(key).map(|r| r.id().clone()))
            .collect()
    }

    fn delete_selected(&mut self) -> usize {
        let keys = self.selected_top_most();
        let records = self.provider_mut().records_mut();
        let removed = keys
            .into_iter()
            .filter_map(|key| records.remove(key))
            .map(|subtree| subtree.count())
            .sum();
        self.sync_to_model();
        removed
    }

    fn duplicate_selected(&mut self, ctx: &CloneContext) -> Result<usize> {
        let keys = self.selected_top_most();
        let mut clones = Vec::with_capacity(keys.len());
        for key in keys {
            let records = self.records();
            let (Some(subtree), Some(row)) =
                (records.clone_subtree(key, ctx, false), records.row_of(key))
            else {
                continue;
            };
            let parent = records.parent(key);
            let id = subtree.record.id().clone();
            self.provider_mut()
                .records_mut()
                .insert_subtrees(parent, Some(row + 1), vec![subtree])?;
            clones.push(id);
        }
        let count = clones.len();
        self.selection_mut().set_selection(clones);
        self.sync_to_model();
        Ok(count)
    }

    fn can_adjust_points(&self, increment: bool) -> bool {
        let records = self.records();
        self.selected_leaves().into_iter().any(|key| {
            records
                .get(key)
                .and_then(Record::raw_points)
                .is_some_and(|points| increment || points > 0.0)
        })
    }

    fn adjust_points(&mut self, increment: bool) -> usize {
        let keys = self.selected_leaves();
        let records = self.provider_mut().records_mut();
        let mut adjusted = 0;
        for key in keys {
            let Some(record) = records.get_mut(key) else {
                continue;
            };
            let Some(points) = record.raw_points() else {
                continue;
            };
            let next = if increment {
                points + 1.0
            } else if points > 0.0 {
                (points - 1.0).max(0.0)
            } else {
                continue;
            };
            if record.set_raw_points(next) {
                adjusted += 1;
            }
        }
        if adjusted > 0 {
            self.sync_to_model();
        }
        adjusted
    }

    fn collect_nameables(&mut self) -> HashMap<String, String> {
        let keys = self.selected_subtree_keys();
        let records = self.provider_mut().records_mut();
        let mut map = HashMap::new();
        for key in keys {
            if let Some(record) = records.get_mut(key) {
                record.fill_nameable_keys(&mut map);
            }
        }
        map
    }

    fn apply_nameables(&mut self, map: &HashMap<String, String>) -> usize {
        let keys = self.selected_subtree_keys();
        let records = self.provider_mut().records_mut();
        let mut applied = 0;
        for key in keys {
            if let Some(record) = records.get_mut(key) {
                record.apply_name_substitutions(map);
                applied += 1;
            }
        }
        self.sync_to_model();
        applied
    }
}
