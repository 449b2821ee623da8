//! The record capability contract.
//!
//! Records are the domain entities shown as table rows: traits, skills,
//! equipment, notes and their modifiers. The outline controller never
//! defines a record type itself; it only requires the capabilities below.

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::cell::{CellData, ColumnId};
use crate::keys::DocumentId;

/// Number of random characters following the kind character of an ID.
const ID_RANDOM_LEN: usize = 16;

/// A stable, globally unique record identifier.
///
/// The first character encodes the record kind so that an ID alone is
/// enough to tell a trait from a modifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh identifier for the given kind.
    pub fn generate(kind: char) -> Self {
        let mut id = String::with_capacity(ID_RANDOM_LEN + kind.len_utf8());
        id.push(kind);
        id.extend(
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(ID_RANDOM_LEN)
                .map(char::from),
        );
        Self(id)
    }

    /// The kind character this ID was generated for.
    pub fn kind_tag(&self) -> Option<char> {
        self.0.chars().next()
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where a clone comes from and where it is going.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneContext {
    /// The document the original belongs to.
    pub source: Option<DocumentId>,
    /// The document that will own the clone.
    pub owner: Option<DocumentId>,
}

/// Which flavor of new item to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemVariant {
    /// A regular leaf item.
    Plain,
    /// A container item.
    Container,
    /// The provider's alternate item (e.g. a natural attack).
    Alternate,
}

/// A domain entity that can be shown as a table row.
pub trait Record: Serialize + DeserializeOwned + 'static {
    /// Stable identity.
    fn id(&self) -> &RecordId;

    /// Human name of the record kind, used in undo edit names.
    fn kind(&self) -> &str;

    /// Short title, used in debug dumps and drag previews.
    fn title(&self) -> String;

    /// Whether this record may hold children.
    fn is_container(&self) -> bool;

    /// The content to show in `column`.
    fn cell_data(&self, column: ColumnId) -> CellData;

    /// Clones this record without its children.
    ///
    /// With `preserve_id` false the clone receives a new ID.
    fn duplicate(&self, ctx: &CloneContext, preserve_id: bool) -> Self;

    /// Tags attached to the record.
    fn tags(&self) -> &[String] {
        &[]
    }

    /// Replaces `@key@` placeholders using `map`.
    fn apply_name_substitutions(&mut self, _map: &HashMap<String, String>) {}

    /// Adds this record's `@key@` placeholders to `map`.
    fn fill_nameable_keys(&mut self, _map: &mut HashMap<String, String>) {}

    /// Directly-entered point cost, for records that have one.
    fn raw_points(&self) -> Option<f64> {
        None
    }

    /// Sets the directly-entered point cost. Returns false if unsupported.
    fn set_raw_points(&mut self, _points: f64) -> bool {
        false
    }
}
