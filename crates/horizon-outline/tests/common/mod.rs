//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use horizon_outline::prelude::*;

pub const NAME: ColumnId = ColumnId(0);
pub const POINTS: ColumnId = ColumnId(1);

pub type EntryProvider = ListProvider<Entry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Trait,
    Modifier,
}

/// A sheet entry: traits may contain other entries, modifiers are leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: RecordId,
    pub kind: EntryKind,
    pub name: String,
    #[serde(default)]
    pub container: bool,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Names of modifiers attached through an alt-drop.
    #[serde(default)]
    pub attached: Vec<String>,
}

impl Entry {
    fn new(kind: EntryKind, name: &str, container: bool) -> Self {
        let tag = match kind {
            EntryKind::Trait => 't',
            EntryKind::Modifier => 'm',
        };
        Self {
            id: RecordId::generate(tag),
            kind,
            name: name.to_string(),
            container,
            points: 0.0,
            tags: Vec::new(),
            attached: Vec::new(),
        }
    }

    pub fn trait_leaf(name: &str, points: f64) -> Self {
        Self {
            points,
            ..Self::new(EntryKind::Trait, name, false)
        }
    }

    pub fn trait_container(name: &str) -> Self {
        Self::new(EntryKind::Trait, name, true)
    }

    pub fn modifier(name: &str) -> Self {
        Self::new(EntryKind::Modifier, name, false)
    }

    pub fn tagged(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

impl Record for Entry {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn kind(&self) -> &str {
        match self.kind {
            EntryKind::Trait => "Trait",
            EntryKind::Modifier => "Modifier",
        }
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn is_container(&self) -> bool {
        self.container
    }

    fn cell_data(&self, column: ColumnId) -> CellData {
        match column {
            NAME => CellData::text(&self.name),
            POINTS => CellData::number(self.points),
            _ => CellData::default(),
        }
    }

    fn duplicate(&self, _ctx: &CloneContext, preserve_id: bool) -> Self {
        let mut copy = self.clone();
        if !preserve_id {
            copy.id = RecordId::generate(self.id.kind_tag().unwrap_or('t'));
        }
        copy
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn raw_points(&self) -> Option<f64> {
        (self.kind == EntryKind::Trait && !self.container).then_some(self.points)
    }

    fn set_raw_points(&mut self, points: f64) -> bool {
        if self.raw_points().is_none() {
            return false;
        }
        self.points = points;
        true
    }
}

/// Keys of the rows built by [`sheet`].
#[derive(Debug, Clone, Copy)]
pub struct SheetKeys {
    pub trait_a: RecordKey,
    pub trait_b: RecordKey,
    pub mod_1: RecordKey,
}

/// `[TraitA, TraitB(container, [Mod1])]`
pub fn sheet() -> (RecordTree<Entry>, SheetKeys) {
    let mut tree = RecordTree::new();
    let trait_a = tree
        .insert(None, None, Entry::trait_leaf("TraitA", 10.0).tagged(&["Physical"]))
        .unwrap();
    let trait_b = tree
        .insert(None, None, Entry::trait_container("TraitB").tagged(&["Mental"]))
        .unwrap();
    let mod_1 = tree
        .insert(Some(trait_b), None, Entry::modifier("Mod1"))
        .unwrap();
    (
        tree,
        SheetKeys {
            trait_a,
            trait_b,
            mod_1,
        },
    )
}

pub fn entry_provider(tree: RecordTree<Entry>) -> EntryProvider {
    ListProvider::builder()
        .records(tree)
        .file_type("sheet")
        .drag_identity("entry")
        .item_names("Entry", "Entries")
        .columns(vec![NAME, POINTS])
        .hierarchy_column(NAME)
        .excess_width_column(NAME)
        .alt_drop("modifier", |host: &mut Entry, payload, ctx| {
            match payload.records::<Entry>(ctx, false) {
                Some(dropped) if !dropped.is_empty() => {
                    host.attached
                        .extend(dropped.into_iter().map(|subtree| subtree.record.name));
                    true
                }
                _ => false,
            }
        })
        .build()
}

/// A flat list of modifiers that can be alt-dropped onto sheet rows.
pub fn modifier_library(names: &[&str]) -> EntryProvider {
    let mut tree = RecordTree::new();
    for name in names {
        tree.insert(None, None, Entry::modifier(name)).unwrap();
    }
    ListProvider::builder()
        .records(tree)
        .file_type("modifiers")
        .drag_identity("modifier")
        .item_names("Modifier", "Modifiers")
        .columns(vec![NAME, POINTS])
        .hierarchy_column(NAME)
        .build()
}

/// A workspace with one undoable window holding the [`sheet`] table.
pub fn sheet_workspace() -> (Workspace, WindowId, TableId, SheetKeys) {
    init_tracing();
    let mut workspace = Workspace::default();
    let window = workspace.add_window("Character Sheet", true);
    let (tree, keys) = sheet();
    let table = workspace
        .add_table(window, None, entry_provider(tree))
        .unwrap();
    (workspace, window, table, keys)
}

pub fn view(workspace: &Workspace, id: TableId) -> &Table<EntryProvider> {
    workspace.table::<EntryProvider>(id).unwrap()
}

pub fn view_mut(workspace: &mut Workspace, id: TableId) -> &mut Table<EntryProvider> {
    workspace.table_mut::<EntryProvider>(id).unwrap()
}

/// Names of the records listed under `parent`, in order.
pub fn names_under(workspace: &Workspace, id: TableId, parent: Option<&str>) -> Vec<String> {
    let records = view(workspace, id).records();
    let parent = parent.map(|name| key_named(workspace, id, name));
    records
        .children_of(parent)
        .iter()
        .filter_map(|&key| records.get(key).map(|r| r.name.clone()))
        .collect()
}

pub fn key_named(workspace: &Workspace, id: TableId, name: &str) -> RecordKey {
    view(workspace, id)
        .records()
        .iter()
        .find(|(_, record)| record.name == name)
        .map(|(key, _)| key)
        .unwrap()
}

pub fn entry_named<'a>(workspace: &'a Workspace, id: TableId, name: &str) -> &'a Entry {
    let key = key_named(workspace, id, name);
    view(workspace, id).records().get(key).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("horizon_outline=debug")
        .with_test_writer()
        .try_init();
}
