//! Record types and trees shared by the unit tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::nameables::{apply_nameables, extract_nameables};
use crate::model::{
    CellData, CloneContext, ColumnId, ItemVariant, Record, RecordId, RecordKey, RecordTree,
};
use crate::provider::{ListProvider, ListProviderBuilder};

pub const NAME_COLUMN: ColumnId = ColumnId(0);
pub const POINTS_COLUMN: ColumnId = ColumnId(1);
pub const TAGS_COLUMN: ColumnId = ColumnId(2);

pub type TraitProvider = ListProvider<Trait>;
pub type ModifierProvider = ListProvider<Modifier>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    pub id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub container: bool,
    #[serde(default)]
    pub points: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
}

impl Trait {
    pub fn leaf(name: impl ToString, points: f64) -> Self {
        Self {
            id: RecordId::generate('t'),
            name: name.to_string(),
            container: false,
            points,
            tags: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn container(name: impl ToString) -> Self {
        Self {
            container: true,
            ..Self::leaf(name, 0.0)
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

impl Record for Trait {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn kind(&self) -> &str {
        "Trait"
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn is_container(&self) -> bool {
        self.container
    }

    fn cell_data(&self, column: ColumnId) -> CellData {
        match column {
            NAME_COLUMN if self.modifiers.is_empty() => CellData::text(&self.name),
            NAME_COLUMN => CellData::text(&self.name).with_secondary(
                self.modifiers
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            POINTS_COLUMN => CellData::number(self.points),
            TAGS_COLUMN => CellData::tags(&self.tags),
            _ => CellData::default(),
        }
    }

    fn duplicate(&self, ctx: &CloneContext, preserve_id: bool) -> Self {
        let mut copy = self.clone();
        if !preserve_id {
            copy.id = RecordId::generate('t');
        }
        copy.modifiers = self
            .modifiers
            .iter()
            .map(|m| m.duplicate(ctx, preserve_id))
            .collect();
        copy
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn apply_name_substitutions(&mut self, map: &HashMap<String, String>) {
        self.name = apply_nameables(&self.name, map);
    }

    fn fill_nameable_keys(&mut self, map: &mut HashMap<String, String>) {
        extract_nameables(&self.name, map);
    }

    fn raw_points(&self) -> Option<f64> {
        (!self.container).then_some(self.points)
    }

    fn set_raw_points(&mut self, points: f64) -> bool {
        if self.container {
            return false;
        }
        self.points = points;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub cost: f64,
}

impl Modifier {
    pub fn new(name: impl ToString, cost: f64) -> Self {
        Self {
            id: RecordId::generate('m'),
            name: name.to_string(),
            cost,
        }
    }
}

impl Record for Modifier {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn kind(&self) -> &str {
        "Modifier"
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn is_container(&self) -> bool {
        false
    }

    fn cell_data(&self, column: ColumnId) -> CellData {
        match column {
            NAME_COLUMN => CellData::text(&self.name),
            POINTS_COLUMN => CellData::number(self.cost),
            _ => CellData::default(),
        }
    }

    fn duplicate(&self, _ctx: &CloneContext, preserve_id: bool) -> Self {
        let mut copy = self.clone();
        if !preserve_id {
            copy.id = RecordId::generate('m');
        }
        copy
    }
}

/// Keys of the records built by [`trait_tree`].
#[derive(Debug, Clone, Copy)]
pub struct TraitKeys {
    pub leaf: RecordKey,
    pub container: RecordKey,
    pub child: RecordKey,
    pub nested: RecordKey,
}

/// ```text
/// Fit (5 points, Physical)
/// Phobias (container, Mental, closed)
/// +-- Spiders
/// `-- Nested (empty container)
/// ```
pub fn trait_tree() -> (RecordTree<Trait>, TraitKeys) {
    let mut tree = RecordTree::new();
    let leaf = tree
        .insert(None, None, Trait::leaf("Fit", 5.0).with_tags(&["Physical"]))
        .unwrap();
    let container = tree
        .insert(None, None, Trait::container("Phobias").with_tags(&["Mental"]))
        .unwrap();
    let child = tree
        .insert(Some(container), None, Trait::leaf("Spiders", 0.0))
        .unwrap();
    let nested = tree
        .insert(Some(container), None, Trait::container("Nested"))
        .unwrap();
    (
        tree,
        TraitKeys {
            leaf,
            container,
            child,
            nested,
        },
    )
}

pub fn trait_provider_builder(tree: RecordTree<Trait>) -> ListProviderBuilder<Trait> {
    ListProvider::builder()
        .records(tree)
        .file_type("traits")
        .drag_identity("trait")
        .item_names("Trait", "Traits")
        .columns(vec![NAME_COLUMN, POINTS_COLUMN, TAGS_COLUMN])
        .hierarchy_column(NAME_COLUMN)
        .excess_width_column(NAME_COLUMN)
        .factory(|variant, _ctx| match variant {
            ItemVariant::Plain => Some(Trait::leaf("Trait", 0.0)),
            ItemVariant::Container => Some(Trait::container("Trait Container")),
            ItemVariant::Alternate => None,
        })
        .alt_drop("modifier", |host: &mut Trait, payload, ctx| {
            match payload.records::<Modifier>(ctx, false) {
                Some(modifiers) if !modifiers.is_empty() => {
                    host.modifiers
                        .extend(modifiers.into_iter().map(|subtree| subtree.record));
                    true
                }
                _ => false,
            }
        })
}

pub fn trait_provider(tree: RecordTree<Trait>) -> TraitProvider {
    trait_provider_builder(tree).build()
}

/// A trait provider that moves rows dropped from other documents.
pub fn moving_trait_provider(tree: RecordTree<Trait>) -> TraitProvider {
    trait_provider_builder(tree).move_between_documents(true).build()
}

pub fn modifier_provider() -> ModifierProvider {
    let mut tree = RecordTree::new();
    for (name, cost) in [("Cannot Float", -10.0), ("Extended", 20.0)] {
        tree.insert(None, None, Modifier::new(name, cost)).unwrap();
    }
    ListProvider::builder()
        .records(tree)
        .file_type("modifiers")
        .drag_identity("modifier")
        .item_names("Modifier", "Modifiers")
        .columns(vec![NAME_COLUMN, POINTS_COLUMN])
        .hierarchy_column(NAME_COLUMN)
        .build()
}
