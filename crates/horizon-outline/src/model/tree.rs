//! The record arena that owns every record of one table.
//!
//! Records live in a [`SlotMap`]; the root list and each container's child
//! list hold [`RecordKey`]s and every slot remembers its parent key. The tree
//! is strictly tree-shaped: a key appears in exactly one list and its parent
//! key matches that list.

use std::collections::{HashMap, HashSet};

use slotmap::{SlotMap, new_key_type};

use horizon_outline_core::{TreeDump, TreeFormatOptions, TreeSource};

use super::record::{CloneContext, Record, RecordId};
use crate::error::{OutlineError, Result};

new_key_type! {
    /// Key of a record inside a [`RecordTree`].
    pub struct RecordKey;
}

/// A detached record together with its descendants.
///
/// Subtrees are how records enter and leave a [`RecordTree`]: they are
/// produced by cloning or extracting and consumed by insertion.
#[derive(Debug)]
pub struct Subtree<R> {
    pub record: R,
    pub open: bool,
    pub children: Vec<Subtree<R>>,
}

impl<R> Subtree<R> {
    /// A subtree with no children.
    pub fn leaf(record: R) -> Self {
        Self {
            record,
            open: false,
            children: Vec::new(),
        }
    }

    /// A subtree holding `children`, initially open.
    pub fn with_children(record: R, children: Vec<Subtree<R>>) -> Self {
        Self {
            record,
            open: true,
            children,
        }
    }

    /// Number of records in this subtree, including the root.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Subtree::count).sum::<usize>()
    }

    /// Deep-clones this subtree through [`Record::duplicate`].
    pub fn duplicate(&self, ctx: &CloneContext, preserve_id: bool) -> Self
    where
        R: Record,
    {
        Self {
            record: self.record.duplicate(ctx, preserve_id),
            open: self.open,
            children: self
                .children
                .iter()
                .map(|child| child.duplicate(ctx, preserve_id))
                .collect(),
        }
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a RecordId>)
    where
        R: Record,
    {
        out.push(self.record.id());
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

struct RecordSlot<R> {
    record: R,
    parent: Option<RecordKey>,
    children: Vec<RecordKey>,
    open: bool,
}

/// Owns the records of one table.
pub struct RecordTree<R> {
    slots: SlotMap<RecordKey, RecordSlot<R>>,
    root_children: Vec<RecordKey>,
    by_id: HashMap<RecordId, RecordKey>,
}

impl<R: Record> Default for RecordTree<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for RecordTree<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordTree")
            .field("len", &self.slots.len())
            .field("roots", &self.root_children.len())
            .finish()
    }
}

impl<R: Record> RecordTree<R> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            root_children: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Builds a tree from detached subtrees, in order, as roots.
    pub fn from_subtrees(subtrees: Vec<Subtree<R>>) -> Result<Self> {
        let mut tree = Self::new();
        tree.insert_subtrees(None, None, subtrees)?;
        Ok(tree)
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the tree holds no records.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if `key` refers to a live record.
    pub fn contains(&self, key: RecordKey) -> bool {
        self.slots.contains_key(key)
    }

    /// The record behind `key`.
    pub fn get(&self, key: RecordKey) -> Option<&R> {
        self.slots.get(key).map(|slot| &slot.record)
    }

    /// Mutable access to the record behind `key`.
    ///
    /// The record's ID must not be changed through this reference.
    pub fn get_mut(&mut self, key: RecordKey) -> Option<&mut R> {
        self.slots.get_mut(key).map(|slot| &mut slot.record)
    }

    /// The key of the record with the given ID.
    pub fn key_of(&self, id: &RecordId) -> Option<RecordKey> {
        self.by_id.get(id).copied()
    }

    /// The parent of `key`, or `None` for roots and unknown keys.
    pub fn parent(&self, key: RecordKey) -> Option<RecordKey> {
        self.slots.get(key).and_then(|slot| slot.parent)
    }

    /// The root list.
    pub fn roots(&self) -> &[RecordKey] {
        &self.root_children
    }

    /// The child list of `parent`, or the root list for `None`.
    pub fn children_of(&self, parent: Option<RecordKey>) -> &[RecordKey] {
        match parent {
            None => &self.root_children,
            Some(key) => self
                .slots
                .get(key)
                .map(|slot| slot.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Position of `key` within its containing list.
    pub fn row_of(&self, key: RecordKey) -> Option<usize> {
        if !self.slots.contains_key(key) {
            return None;
        }
        self.children_of(self.parent(key))
            .iter()
            .position(|&k| k == key)
    }

    /// Returns true if `key` is `ancestor` or lies somewhere below it.
    pub fn is_within(&self, key: RecordKey, ancestor: RecordKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.parent(k);
        }
        false
    }

    /// Nesting depth of `key`; roots are at depth zero.
    pub fn depth(&self, key: RecordKey) -> usize {
        let mut depth = 0;
        let mut current = self.parent(key);
        while let Some(k) = current {
            depth += 1;
            current = self.parent(k);
        }
        depth
    }

    /// Iterates over every record in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordKey, &R)> {
        self.slots.iter().map(|(key, slot)| (key, &slot.record))
    }

    /// Every key in display order (parents before children, siblings in order).
    pub fn preorder(&self) -> Vec<RecordKey> {
        let mut out = Vec::with_capacity(self.slots.len());
        let mut stack: Vec<RecordKey> = self.root_children.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            out.push(key);
            if let Some(slot) = self.slots.get(key) {
                stack.extend(slot.children.iter().rev().copied());
            }
        }
        out
    }

    /// Whether the container `key` is expanded.
    pub fn is_open(&self, key: RecordKey) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.open && slot.record.is_container())
    }

    /// Expands or collapses `key`. Returns false for non-containers.
    pub fn set_open(&mut self, key: RecordKey, open: bool) -> bool {
        match self.slots.get_mut(key) {
            Some(slot) if slot.record.is_container() => {
                slot.open = open;
                true
            }
            _ => false,
        }
    }

    /// IDs of every expanded container.
    pub fn open_ids(&self) -> HashSet<RecordId> {
        self.slots
            .values()
            .filter(|slot| slot.open && slot.record.is_container())
            .map(|slot| slot.record.id().clone())
            .collect()
    }

    /// Expands exactly the containers whose IDs are in `ids`.
    pub fn apply_open_ids(&mut self, ids: &HashSet<RecordId>) {
        for slot in self.slots.values_mut() {
            slot.open = slot.record.is_container() && ids.contains(slot.record.id());
        }
    }

    /// Inserts a single record without children.
    pub fn insert(
        &mut self,
        parent: Option<RecordKey>,
        index: Option<usize>,
        record: R,
    ) -> Result<RecordKey> {
        let mut keys = self.insert_subtrees(parent, index, vec![Subtree::leaf(record)])?;
        keys.pop()
            .ok_or_else(|| OutlineError::invalid_edit("insert produced no record"))
    }

    /// Inserts `subtrees` into the child list of `parent` starting at `index`.
    ///
    /// A missing index appends. Returns the keys of the inserted subtree roots
    /// in order. Nothing is inserted if the parent is not a container or any
    /// incoming ID already exists.
    pub fn insert_subtrees(
        &mut self,
        parent: Option<RecordKey>,
        index: Option<usize>,
        subtrees: Vec<Subtree<R>>,
    ) -> Result<Vec<RecordKey>> {
        self.check_parent(parent)?;

        let mut incoming = Vec::new();
        for subtree in &subtrees {
            subtree.collect_ids(&mut incoming);
        }
        let mut seen = HashSet::with_capacity(incoming.len());
        for id in incoming {
            if self.by_id.contains_key(id) || !seen.insert(id) {
                return Err(OutlineError::invalid_edit(format!("duplicate record {id}")));
            }
        }

        let len = self.children_of(parent).len();
        let at = index.map_or(len, |i| i.min(len));
        let keys: Vec<RecordKey> = subtrees
            .into_iter()
            .map(|subtree| self.attach(parent, subtree))
            .collect();
        let list = self.list_mut(parent);
        list.splice(at..at, keys.iter().copied());
        Ok(keys)
    }

    /// Detaches `key` and everything below it.
    pub fn remove(&mut self, key: RecordKey) -> Option<Subtree<R>> {
        if !self.slots.contains_key(key) {
            return None;
        }
        self.unlink(key);
        self.take_subtree(key)
    }

    /// Deep-clones the subtree rooted at `key`.
    pub fn clone_subtree(
        &self,
        key: RecordKey,
        ctx: &CloneContext,
        preserve_id: bool,
    ) -> Option<Subtree<R>> {
        let slot = self.slots.get(key)?;
        Some(Subtree {
            record: slot.record.duplicate(ctx, preserve_id),
            open: slot.open,
            children: slot
                .children
                .iter()
                .filter_map(|&child| self.clone_subtree(child, ctx, preserve_id))
                .collect(),
        })
    }

    /// Swaps the record at `key` for `record`, keeping its position and
    /// children. The replacement must carry the same ID, and a record with
    /// children must stay a container.
    pub fn replace_record(&mut self, key: RecordKey, record: R) -> Result<R> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| OutlineError::unknown("record"))?;
        if slot.record.id() != record.id() {
            return Err(OutlineError::invalid_edit(format!(
                "replacement for {} carries ID {}",
                slot.record.id(),
                record.id()
            )));
        }
        if !slot.children.is_empty() && !record.is_container() {
            return Err(OutlineError::NotAContainer(record.id().to_string()));
        }
        if !record.is_container() {
            slot.open = false;
        }
        Ok(std::mem::replace(&mut slot.record, record))
    }

    /// Replaces the child list of `parent` (the root list for `None`).
    ///
    /// Keys that move in from elsewhere are re-parented; records that were in
    /// the old list but not the new one are deleted with their descendants.
    pub fn set_children(&mut self, parent: Option<RecordKey>, keys: Vec<RecordKey>) -> Result<()> {
        self.check_parent(parent)?;
        let mut seen = HashSet::with_capacity(keys.len());
        for &key in &keys {
            if !self.slots.contains_key(key) {
                return Err(OutlineError::unknown("record"));
            }
            if !seen.insert(key) {
                return Err(OutlineError::invalid_edit("record listed twice"));
            }
            if let Some(p) = parent
                && self.is_within(p, key)
            {
                return Err(OutlineError::invalid_edit(
                    "a record cannot become its own descendant",
                ));
            }
        }

        let old = std::mem::take(self.list_mut(parent));
        for &key in &keys {
            let previous = self.parent(key);
            if previous != parent {
                self.list_mut(previous).retain(|&k| k != key);
            }
            if let Some(slot) = self.slots.get_mut(key) {
                slot.parent = parent;
            }
        }
        for key in old {
            if !seen.contains(&key) {
                self.take_subtree(key);
            }
        }
        *self.list_mut(parent) = keys;
        Ok(())
    }

    /// Replaces the root list. See [`set_children`](Self::set_children).
    pub fn set_roots(&mut self, keys: Vec<RecordKey>) -> Result<()> {
        self.set_children(None, keys)
    }

    /// Moves `keys` (with their subtrees) into `parent` at `index`.
    ///
    /// `index` refers to the destination list as it was before the move.
    /// Keys nested under another moved key travel with it. Returns the moved
    /// top-most keys in display order.
    pub fn move_to(
        &mut self,
        keys: &[RecordKey],
        parent: Option<RecordKey>,
        index: Option<usize>,
    ) -> Result<Vec<RecordKey>> {
        self.check_parent(parent)?;
        let moving = self.top_most(keys);
        if let Some(p) = parent
            && moving.iter().any(|&key| self.is_within(p, key))
        {
            return Err(OutlineError::invalid_edit(
                "a record cannot be moved into itself",
            ));
        }

        let list = self.children_of(parent);
        let mut at = index.map_or(list.len(), |i| i.min(list.len()));
        at -= list[..at].iter().filter(|k| moving.contains(*k)).count();

        for &key in &moving {
            self.unlink(key);
            if let Some(slot) = self.slots.get_mut(key) {
                slot.parent = parent;
            }
        }
        let list = self.list_mut(parent);
        let at = at.min(list.len());
        list.splice(at..at, moving.iter().copied());
        Ok(moving)
    }

    /// Reduces `keys` to those with no ancestor also in `keys`, in display order.
    pub fn top_most(&self, keys: &[RecordKey]) -> Vec<RecordKey> {
        let wanted: HashSet<RecordKey> = keys
            .iter()
            .copied()
            .filter(|&k| self.slots.contains_key(k))
            .collect();
        self.preorder()
            .into_iter()
            .filter(|&key| {
                wanted.contains(&key) && {
                    let mut current = self.parent(key);
                    let mut covered = false;
                    while let Some(p) = current {
                        if wanted.contains(&p) {
                            covered = true;
                            break;
                        }
                        current = self.parent(p);
                    }
                    !covered
                }
            })
            .collect()
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.root_children.clear();
        self.by_id.clear();
    }

    /// Verifies that every record sits in exactly one list matching its
    /// parent key and that the ID index is consistent.
    pub fn check_integrity(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.slots.len());
        let mut stack: Vec<(Option<RecordKey>, RecordKey)> =
            self.root_children.iter().map(|&k| (None, k)).collect();
        while let Some((expected_parent, key)) = stack.pop() {
            let slot = self
                .slots
                .get(key)
                .ok_or_else(|| OutlineError::invalid_edit("dangling key in child list"))?;
            if !seen.insert(key) {
                return Err(OutlineError::invalid_edit(format!(
                    "record {} appears in more than one list",
                    slot.record.id()
                )));
            }
            if slot.parent != expected_parent {
                return Err(OutlineError::invalid_edit(format!(
                    "record {} has an inconsistent parent",
                    slot.record.id()
                )));
            }
            if !slot.children.is_empty() && !slot.record.is_container() {
                return Err(OutlineError::NotAContainer(slot.record.id().to_string()));
            }
            stack.extend(slot.children.iter().map(|&c| (Some(key), c)));
        }
        if seen.len() != self.slots.len() {
            return Err(OutlineError::invalid_edit("unreachable records in arena"));
        }
        if self.by_id.len() != self.slots.len()
            || self
                .by_id
                .iter()
                .any(|(id, &key)| self.get(key).is_none_or(|r| r.id() != id))
        {
            return Err(OutlineError::invalid_edit("ID index out of sync"));
        }
        Ok(())
    }

    /// Renders the tree as text for debugging.
    pub fn dump(&self, options: TreeFormatOptions) -> String {
        TreeDump::with_options(options).format(self)
    }

    fn check_parent(&self, parent: Option<RecordKey>) -> Result<()> {
        match parent {
            None => Ok(()),
            Some(key) => match self.slots.get(key) {
                None => Err(OutlineError::unknown("record")),
                Some(slot) if !slot.record.is_container() => {
                    Err(OutlineError::NotAContainer(slot.record.id().to_string()))
                }
                Some(_) => Ok(()),
            },
        }
    }

    fn list_mut(&mut self, parent: Option<RecordKey>) -> &mut Vec<RecordKey> {
        match parent.and_then(|key| self.slots.get_mut(key)) {
            Some(slot) => &mut slot.children,
            None => &mut self.root_children,
        }
    }

    fn unlink(&mut self, key: RecordKey) {
        let parent = self.parent(key);
        self.list_mut(parent).retain(|&k| k != key);
    }

    fn attach(&mut self, parent: Option<RecordKey>, subtree: Subtree<R>) -> RecordKey {
        let Subtree {
            record,
            open,
            children,
        } = subtree;
        let id = record.id().clone();
        let key = self.slots.insert(RecordSlot {
            record,
            parent,
            children: Vec::new(),
            open,
        });
        self.by_id.insert(id, key);
        let child_keys: Vec<RecordKey> = children
            .into_iter()
            .map(|child| self.attach(Some(key), child))
            .collect();
        if let Some(slot) = self.slots.get_mut(key) {
            slot.children = child_keys;
        }
        key
    }

    /// Removes the slots of `key` and its descendants. The caller unlinks.
    fn take_subtree(&mut self, key: RecordKey) -> Option<Subtree<R>> {
        let slot = self.slots.remove(key)?;
        self.by_id.remove(slot.record.id());
        let children = slot
            .children
            .into_iter()
            .filter_map(|child| self.take_subtree(child))
            .collect();
        Some(Subtree {
            record: slot.record,
            open: slot.open,
            children,
        })
    }
}

impl<R: Record> TreeSource for RecordTree<R> {
    type Node = RecordKey;

    fn roots(&self) -> Vec<RecordKey> {
        self.root_children.clone()
    }

    fn children(&self, node: RecordKey) -> Vec<RecordKey> {
        self.children_of(Some(node)).to_vec()
    }

    fn label(&self, node: RecordKey) -> String {
        self.get(node).map(Record::title).unwrap_or_default()
    }

    fn node_id(&self, node: RecordKey) -> String {
        self.get(node).map(|r| r.id().to_string()).unwrap_or_default()
    }
}
