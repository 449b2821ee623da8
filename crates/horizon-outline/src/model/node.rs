//! The lazy row projection of a [`RecordTree`].
//!
//! A [`NodeTree`] mirrors the record tree one node per record, but only for
//! the parts that have been looked at: a node's child list stays unbuilt
//! until [`NodeTree::children`] asks for it. Nodes carry UI-only state (the
//! render caches) and are rebuilt from the records on every sync, so they
//! never need to be kept consistent with record edits by hand.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use super::cell::ColumnId;
use super::record::Record;
use super::render::{CellCache, CellRenderer, RenderedCell};
use super::sort::{CONTAINER_MARKER, SortOrder, ordered_cmp};
use super::tree::{RecordKey, RecordTree};
use crate::error::{OutlineError, Result};

new_key_type! {
    /// Key of a node inside a [`NodeTree`].
    pub struct NodeKey;
}

/// The column and direction a table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: ColumnId,
    pub order: SortOrder,
}

/// A row as laid out for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRow {
    pub node: NodeKey,
    pub record: RecordKey,
    pub depth: usize,
}

struct Node {
    record: RecordKey,
    parent: Option<NodeKey>,
    children: Option<Vec<NodeKey>>,
    cells: Vec<CellCache>,
}

/// Per-table projection of records into rows.
pub struct NodeTree {
    nodes: SlotMap<NodeKey, Node>,
    roots: Vec<NodeKey>,
    by_record: HashMap<RecordKey, NodeKey>,
    columns: Vec<ColumnId>,
    sort: Option<SortSpec>,
    group_containers: bool,
}

impl std::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots.len())
            .field("columns", &self.columns)
            .field("sort", &self.sort)
            .finish()
    }
}

impl NodeTree {
    /// Creates an empty projection with the given columns.
    pub fn new(columns: Vec<ColumnId>, group_containers: bool) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            by_record: HashMap::new(),
            columns,
            sort: None,
            group_containers,
        }
    }

    /// Column IDs in display order.
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// The current sort, if any.
    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// Number of nodes built so far.
    pub fn built_len(&self) -> usize {
        self.nodes.len()
    }

    /// Discards every node and rebuilds the root level from `records`.
    pub fn sync<R: Record>(&mut self, records: &RecordTree<R>) {
        self.nodes.clear();
        self.by_record.clear();
        let mut roots: Vec<NodeKey> = records
            .roots()
            .iter()
            .map(|&record| self.make_node(record, None))
            .collect();
        self.sort_list(records, &mut roots);
        self.roots = roots;
    }

    /// Root nodes in display order.
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// The record projected by `node`.
    pub fn record_key(&self, node: NodeKey) -> Option<RecordKey> {
        self.nodes.get(node).map(|n| n.record)
    }

    /// The node for `record`, if it has been built.
    pub fn node_for(&self, record: RecordKey) -> Option<NodeKey> {
        self.by_record.get(&record).copied()
    }

    /// Parent node of `node`.
    pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Returns true if the child list of `node` has been built.
    pub fn is_children_built(&self, node: NodeKey) -> bool {
        self.nodes.get(node).is_some_and(|n| n.children.is_some())
    }

    /// Child nodes of `node`, building them from the records on first use.
    pub fn children<R: Record>(&mut self, records: &RecordTree<R>, node: NodeKey) -> Vec<NodeKey> {
        let Some(entry) = self.nodes.get(node) else {
            return Vec::new();
        };
        if let Some(children) = &entry.children {
            return children.clone();
        }
        let record = entry.record;
        let mut children: Vec<NodeKey> = records
            .children_of(Some(record))
            .iter()
            .map(|&child| self.make_node(child, Some(node)))
            .collect();
        self.sort_list(records, &mut children);
        if let Some(entry) = self.nodes.get_mut(node) {
            entry.children = Some(children.clone());
        }
        children
    }

    /// Replaces the children of `node`'s record and drops the cached child
    /// list.
    pub fn set_children<R: Record>(
        &mut self,
        records: &mut RecordTree<R>,
        node: NodeKey,
        keys: Vec<RecordKey>,
    ) -> Result<()> {
        let record = self
            .record_key(node)
            .ok_or_else(|| OutlineError::unknown("node"))?;
        records.set_children(Some(record), keys)?;
        self.invalidate_children(node);
        Ok(())
    }

    /// Expands or collapses `node`'s record. Only containers can be opened.
    pub fn set_open<R: Record>(
        &mut self,
        records: &mut RecordTree<R>,
        node: NodeKey,
        open: bool,
    ) -> bool {
        self.record_key(node)
            .is_some_and(|record| records.set_open(record, open))
    }

    /// Whether `node`'s record is an expanded container.
    pub fn is_open<R: Record>(&self, records: &RecordTree<R>, node: NodeKey) -> bool {
        self.record_key(node)
            .is_some_and(|record| records.is_open(record))
    }

    /// The rendering of `column` for `node` at `width`, served from the
    /// node's cache when neither the cell data nor the width changed.
    pub fn cell_at<R: Record>(
        &mut self,
        records: &RecordTree<R>,
        node: NodeKey,
        column: ColumnId,
        width: f32,
        renderer: &dyn CellRenderer,
    ) -> Option<Arc<RenderedCell>> {
        let index = self.columns.iter().position(|&c| c == column)?;
        let entry = self.nodes.get_mut(node)?;
        let data = records.get(entry.record)?.cell_data(column);
        let cache = entry.cells.get_mut(index)?;
        Some(cache.get_or_render(data, width, renderer))
    }

    /// Returns true if the cache for `column` of `node` holds a rendering.
    pub fn is_cell_cached(&self, node: NodeKey, column: ColumnId) -> bool {
        let Some(index) = self.columns.iter().position(|&c| c == column) else {
            return false;
        };
        self.nodes
            .get(node)
            .and_then(|n| n.cells.get(index))
            .is_some_and(CellCache::is_cached)
    }

    /// Comparison key for sorting `node` by `column`.
    pub fn id_for_sort<R: Record>(
        &self,
        records: &RecordTree<R>,
        node: NodeKey,
        column: ColumnId,
        group_containers: bool,
    ) -> String {
        let Some(record) = self.record_key(node).and_then(|key| records.get(key)) else {
            return String::new();
        };
        sort_key(record, column, group_containers)
    }

    /// Sorts every sibling list by `sort`, or restores record order for
    /// `None`. Records are not touched.
    pub fn sort_by<R: Record>(&mut self, records: &RecordTree<R>, sort: Option<SortSpec>) {
        self.sort = sort;
        if sort.is_none() {
            self.sync(records);
            return;
        }
        let mut roots = std::mem::take(&mut self.roots);
        self.sort_list(records, &mut roots);
        self.roots = roots;
        let built: Vec<NodeKey> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.children.is_some())
            .map(|(key, _)| key)
            .collect();
        for key in built {
            let mut children = self
                .nodes
                .get_mut(key)
                .and_then(|n| n.children.take())
                .unwrap_or_default();
            self.sort_list(records, &mut children);
            if let Some(n) = self.nodes.get_mut(key) {
                n.children = Some(children);
            }
        }
    }

    /// Lays out the rows to display.
    ///
    /// Without a visibility set, children are shown for open containers.
    /// With one, only rows in the set are shown and every shown container
    /// is expanded so that matching descendants appear.
    pub fn visible_rows<R: Record>(
        &mut self,
        records: &RecordTree<R>,
        visible: Option<&HashSet<RecordKey>>,
    ) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        let mut stack: Vec<(NodeKey, usize)> = self.roots.iter().rev().map(|&n| (n, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            let Some(record) = self.record_key(node) else {
                continue;
            };
            if visible.is_some_and(|set| !set.contains(&record)) {
                continue;
            }
            rows.push(VisibleRow {
                node,
                record,
                depth,
            });
            let expand = match visible {
                Some(_) => records.get(record).is_some_and(Record::is_container),
                None => records.is_open(record),
            };
            if expand {
                let children = self.children(records, node);
                stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
            }
        }
        rows
    }

    fn make_node(&mut self, record: RecordKey, parent: Option<NodeKey>) -> NodeKey {
        let key = self.nodes.insert(Node {
            record,
            parent,
            children: None,
            cells: vec![CellCache::new(); self.columns.len()],
        });
        self.by_record.insert(record, key);
        key
    }

    fn invalidate_children(&mut self, node: NodeKey) {
        let stale = self
            .nodes
            .get_mut(node)
            .and_then(|n| n.children.take())
            .unwrap_or_default();
        let mut stack = stale;
        while let Some(key) = stack.pop() {
            if let Some(removed) = self.nodes.remove(key) {
                if self.by_record.get(&removed.record) == Some(&key) {
                    self.by_record.remove(&removed.record);
                }
                stack.extend(removed.children.unwrap_or_default());
            }
        }
    }

    fn sort_list<R: Record>(&self, records: &RecordTree<R>, list: &mut [NodeKey]) {
        let Some(spec) = self.sort else {
            return;
        };
        let mut keyed: Vec<(String, NodeKey)> = list
            .iter()
            .map(|&node| {
                (
                    self.id_for_sort(records, node, spec.column, self.group_containers),
                    node,
                )
            })
            .collect();
        keyed.sort_by(|(a, _), (b, _)| ordered_cmp(a, b, spec.order));
        for (slot, (_, node)) in list.iter_mut().zip(keyed) {
            *slot = node;
        }
    }
}

fn sort_key<R: Record>(record: &R, column: ColumnId, group_containers: bool) -> String {
    let text = record.cell_data(column).for_sort();
    if group_containers && record.is_container() {
        format!("{CONTAINER_MARKER}{text}")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::render::TextCellRenderer;
    use crate::testing::{NAME_COLUMN, POINTS_COLUMN, Trait, trait_tree};

    fn titles(nodes: &NodeTree, records: &RecordTree<Trait>, keys: &[NodeKey]) -> Vec<String> {
        keys.iter()
            .map(|&n| records.get(nodes.record_key(n).unwrap()).unwrap().title())
            .collect()
    }

    #[test]
    fn test_children_are_lazy() {
        let (records, keys) = trait_tree();
        let mut nodes = NodeTree::new(vec![NAME_COLUMN], false);
        nodes.sync(&records);
        assert_eq!(nodes.roots().len(), 2);
        let container = nodes.node_for(keys.container).unwrap();
        assert!(!nodes.is_children_built(container));
        assert_eq!(nodes.built_len(), 2);

        let children = nodes.children(&records, container);
        assert_eq!(children.len(), 2);
        assert!(nodes.is_children_built(container));
        assert_eq!(nodes.parent(children[0]), Some(container));
    }

    #[test]
    fn test_set_children_invalidates() {
        let (mut records, keys) = trait_tree();
        let mut nodes = NodeTree::new(vec![NAME_COLUMN], false);
        nodes.sync(&records);
        let container = nodes.node_for(keys.container).unwrap();
        nodes.children(&records, container);

        nodes
            .set_children(&mut records, container, vec![keys.child])
            .unwrap();
        assert!(!nodes.is_children_built(container));
        assert!(nodes.node_for(keys.child).is_none());
        assert_eq!(nodes.children(&records, container).len(), 1);
        assert!(!records.contains(keys.nested));
    }

    #[test]
    fn test_cell_cache_reused() {
        let (records, keys) = trait_tree();
        let mut nodes = NodeTree::new(vec![NAME_COLUMN, POINTS_COLUMN], false);
        nodes.sync(&records);
        let leaf = nodes.node_for(keys.leaf).unwrap();
        let renderer = TextCellRenderer::default();
        assert!(!nodes.is_cell_cached(leaf, NAME_COLUMN));
        let first = nodes
            .cell_at(&records, leaf, NAME_COLUMN, 120.0, &renderer)
            .unwrap();
        let second = nodes
            .cell_at(&records, leaf, NAME_COLUMN, 120.0, &renderer)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.primary_lines, vec!["Fit"]);
        assert!(nodes.is_cell_cached(leaf, NAME_COLUMN));
        assert!(!nodes.is_cell_cached(leaf, POINTS_COLUMN));
    }

    #[test]
    fn test_id_for_sort_groups_containers() {
        let (records, keys) = trait_tree();
        let mut nodes = NodeTree::new(vec![NAME_COLUMN], false);
        nodes.sync(&records);
        let container = nodes.node_for(keys.container).unwrap();
        let grouped = nodes.id_for_sort(&records, container, NAME_COLUMN, true);
        assert!(grouped.starts_with(CONTAINER_MARKER));
        assert_eq!(
            nodes.id_for_sort(&records, container, NAME_COLUMN, false),
            "Phobias"
        );
    }

    #[test]
    fn test_sort_by_leaves_records_alone() {
        let (records, _) = trait_tree();
        let mut nodes = NodeTree::new(vec![NAME_COLUMN], false);
        nodes.sync(&records);
        nodes.sort_by(
            &records,
            Some(SortSpec {
                column: NAME_COLUMN,
                order: SortOrder::Descending,
            }),
        );
        assert_eq!(titles(&nodes, &records, nodes.roots()), ["Phobias", "Fit"]);
        assert_eq!(records.get(records.roots()[0]).unwrap().title(), "Fit");

        nodes.sort_by(&records, None);
        assert_eq!(titles(&nodes, &records, nodes.roots()), ["Fit", "Phobias"]);
    }

    #[test]
    fn test_grouped_containers_sort_by_decimal_points() {
        let mut records = RecordTree::new();
        let mut high = Trait::container("B");
        high.points = 1.5;
        let mut low = Trait::container("A");
        low.points = 1.25;
        records.insert(None, None, Trait::leaf("Leaf", 0.5)).unwrap();
        records.insert(None, None, high).unwrap();
        records.insert(None, None, low).unwrap();

        let mut nodes = NodeTree::new(vec![NAME_COLUMN, POINTS_COLUMN], true);
        nodes.sync(&records);
        let mut spec = SortSpec {
            column: POINTS_COLUMN,
            order: SortOrder::Ascending,
        };
        nodes.sort_by(&records, Some(spec));
        assert_eq!(titles(&nodes, &records, nodes.roots()), ["A", "B", "Leaf"]);

        spec.order = SortOrder::Descending;
        nodes.sort_by(&records, Some(spec));
        assert_eq!(titles(&nodes, &records, nodes.roots()), ["B", "A", "Leaf"]);
    }

    #[test]
    fn test_visible_rows_follow_open_state() {
        let (mut records, keys) = trait_tree();
        let mut nodes = NodeTree::new(vec![NAME_COLUMN], false);
        nodes.sync(&records);
        assert_eq!(nodes.visible_rows(&records, None).len(), 2);

        records.set_open(keys.container, true);
        let rows = nodes.visible_rows(&records, None);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2].depth, 1);
    }

    #[test]
    fn test_visible_rows_filtered_expands() {
        let (records, keys) = trait_tree();
        let mut nodes = NodeTree::new(vec![NAME_COLUMN], false);
        nodes.sync(&records);
        let visible = HashSet::from([keys.container, keys.child]);
        let rows = nodes.visible_rows(&records, Some(&visible));
        let shown: Vec<RecordKey> = rows.iter().map(|r| r.record).collect();
        assert_eq!(shown, vec![keys.container, keys.child]);
    }
}
