//! Table providers: the authoritative records of one collection plus the
//! policy for showing, creating, serializing and dropping them.
//!
//! Domain code implements [`TableProvider`] directly or configures a
//! [`ListProvider`] through its builder:
//!
//! ```ignore
//! let provider = ListProvider::<Trait>::builder()
//!     .file_type("traits")
//!     .drag_identity("trait")
//!     .item_names("Trait", "Traits")
//!     .columns(vec![NAME, POINTS])
//!     .hierarchy_column(NAME)
//!     .factory(|variant, _ctx| Some(Trait::new(variant)))
//!     .build();
//! ```

use std::collections::HashMap;

use crate::codec;
use crate::drag::DragPayload;
use crate::error::Result;
use crate::keys::{DocumentId, TableId};
use crate::model::{CloneContext, ColumnId, ItemVariant, Record, RecordKey, RecordTree};

/// Identifies a table together with the document it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub table: TableId,
    pub document: Option<DocumentId>,
}

/// The data and policy behind one table.
pub trait TableProvider: 'static {
    /// The record type shown in the table.
    type Record: Record;

    /// The record tree.
    fn records(&self) -> &RecordTree<Self::Record>;

    /// Mutable access to the record tree.
    fn records_mut(&mut self) -> &mut RecordTree<Self::Record>;

    /// Replaces the root list. Records left out are deleted.
    fn set_root_records(&mut self, roots: Vec<RecordKey>) -> Result<()> {
        self.records_mut().set_roots(roots)
    }

    /// Replaces the whole record tree.
    fn replace_records(&mut self, tree: RecordTree<Self::Record>) {
        *self.records_mut() = tree;
    }

    /// Column IDs in display order.
    fn column_ids(&self) -> Vec<ColumnId>;

    /// The column that shows the tree structure.
    fn hierarchy_column(&self) -> Option<ColumnId> {
        None
    }

    /// The column that absorbs spare width.
    fn excess_width_column(&self) -> Option<ColumnId> {
        None
    }

    /// Rows can only be dropped onto tables with the same identity.
    fn drag_identity(&self) -> &str;

    /// Singular and plural names of the items, e.g. ("Trait", "Traits").
    fn item_names(&self) -> (&str, &str);

    /// Envelope type used by the codec.
    fn file_type(&self) -> &str;

    /// Creates a new item, or `None` if `variant` is not supported.
    fn create_item(&self, variant: ItemVariant, ctx: &CloneContext) -> Option<Self::Record>;

    /// Encodes every record.
    fn serialize(&self) -> Result<Vec<u8>> {
        codec::encode(self.file_type(), self.records())
    }

    /// Replaces every record with the decoded `data`.
    ///
    /// Nothing changes if decoding fails.
    fn deserialize(&mut self, data: &[u8]) -> Result<()> {
        let tree = codec::decode(self.file_type(), data)?;
        self.replace_records(tree);
        Ok(())
    }

    /// Every tag used by any record, sorted and deduplicated ignoring case.
    fn all_tags(&self) -> Vec<String> {
        let mut seen: HashMap<String, String> = HashMap::new();
        for (_, record) in self.records().iter() {
            for tag in record.tags() {
                let trimmed = tag.trim();
                if !trimmed.is_empty() {
                    seen.entry(trimmed.to_lowercase())
                        .or_insert_with(|| trimmed.to_string());
                }
            }
        }
        let mut tags: Vec<(String, String)> = seen.into_iter().collect();
        tags.sort();
        tags.into_iter().map(|(_, tag)| tag).collect()
    }

    /// Whether rows dragged from `from` onto this table (`to`) move rather
    /// than copy.
    fn drop_should_move(&self, from: TableRef, to: TableRef) -> bool {
        from.table == to.table || (from.document.is_some() && from.document == to.document)
    }

    /// Called after dropped or copied rows have been inserted.
    fn process_drop(&mut self, _inserted: &[RecordKey]) {}

    /// Identity of payloads that can be attached onto a row.
    fn alt_drop_identity(&self) -> Option<&str> {
        None
    }

    /// Attaches the payload's records to `target`. Returns true if anything
    /// changed.
    fn alt_drop(
        &mut self,
        _target: RecordKey,
        _payload: &DragPayload,
        _ctx: &CloneContext,
    ) -> Result<bool> {
        Ok(false)
    }
}

type ItemFactory<R> = Box<dyn Fn(ItemVariant, &CloneContext) -> Option<R>>;
type AttachHook<R> = Box<dyn FnMut(&mut R, &DragPayload, &CloneContext) -> bool>;
type PostDropHook<R> = Box<dyn FnMut(&mut RecordTree<R>, &[RecordKey])>;

/// A configurable [`TableProvider`] over any record type.
pub struct ListProvider<R: Record> {
    records: RecordTree<R>,
    file_type: String,
    drag_identity: String,
    singular: String,
    plural: String,
    columns: Vec<ColumnId>,
    hierarchy_column: Option<ColumnId>,
    excess_width_column: Option<ColumnId>,
    move_between_documents: bool,
    factory: Option<ItemFactory<R>>,
    alt_drop_identity: Option<String>,
    attach: Option<AttachHook<R>>,
    post_drop: Option<PostDropHook<R>>,
}

impl<R: Record> std::fmt::Debug for ListProvider<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListProvider")
            .field("file_type", &self.file_type)
            .field("drag_identity", &self.drag_identity)
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl<R: Record> ListProvider<R> {
    /// Creates a builder.
    pub fn builder() -> ListProviderBuilder<R> {
        ListProviderBuilder::new()
    }
}

impl<R: Record> TableProvider for ListProvider<R> {
    type Record = R;

    fn records(&self) -> &RecordTree<R> {
        &self.records
    }

    fn records_mut(&mut self) -> &mut RecordTree<R> {
        &mut self.records
    }

    fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.clone()
    }

    fn hierarchy_column(&self) -> Option<ColumnId> {
        self.hierarchy_column
    }

    fn excess_width_column(&self) -> Option<ColumnId> {
        self.excess_width_column
    }

    fn drag_identity(&self) -> &str {
        &self.drag_identity
    }

    fn item_names(&self) -> (&str, &str) {
        (&self.singular, &self.plural)
    }

    fn file_type(&self) -> &str {
        &self.file_type
    }

    fn create_item(&self, variant: ItemVariant, ctx: &CloneContext) -> Option<R> {
        self.factory.as_ref().and_then(|factory| factory(variant, ctx))
    }

    fn drop_should_move(&self, from: TableRef, to: TableRef) -> bool {
        from.table == to.table
            || (from.document.is_some() && from.document == to.document)
            || self.move_between_documents
    }

    fn process_drop(&mut self, inserted: &[RecordKey]) {
        if let Some(hook) = self.post_drop.as_mut() {
            hook(&mut self.records, inserted);
        }
    }

    fn alt_drop_identity(&self) -> Option<&str> {
        self.alt_drop_identity.as_deref()
    }

    fn alt_drop(
        &mut self,
        target: RecordKey,
        payload: &DragPayload,
        ctx: &CloneContext,
    ) -> Result<bool> {
        let Some(attach) = self.attach.as_mut() else {
            return Ok(false);
        };
        let Some(host) = self.records.get_mut(target) else {
            return Err(crate::error::OutlineError::unknown("record"));
        };
        let changed = attach(host, payload, ctx);
        if changed && let Some(hook) = self.post_drop.as_mut() {
            hook(&mut self.records, &[target]);
        }
        Ok(changed)
    }
}

/// Builder for [`ListProvider`].
pub struct ListProviderBuilder<R: Record> {
    provider: ListProvider<R>,
}

impl<R: Record> Default for ListProviderBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> ListProviderBuilder<R> {
    /// Creates a builder with empty records and no columns.
    pub fn new() -> Self {
        Self {
            provider: ListProvider {
                records: RecordTree::new(),
                file_type: String::from("list"),
                drag_identity: String::from("list"),
                singular: String::from("Item"),
                plural: String::from("Items"),
                columns: Vec::new(),
                hierarchy_column: None,
                excess_width_column: None,
                move_between_documents: false,
                factory: None,
                alt_drop_identity: None,
                attach: None,
                post_drop: None,
            },
        }
    }

    /// Sets the initial records.
    pub fn records(mut self, records: RecordTree<R>) -> Self {
        self.provider.records = records;
        self
    }

    /// Sets the codec envelope type.
    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.provider.file_type = file_type.into();
        self
    }

    /// Sets the drag identity.
    pub fn drag_identity(mut self, identity: impl Into<String>) -> Self {
        self.provider.drag_identity = identity.into();
        self
    }

    /// Sets the singular and plural item names.
    pub fn item_names(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.provider.singular = singular.into();
        self.provider.plural = plural.into();
        self
    }

    /// Sets the column IDs.
    pub fn columns(mut self, columns: Vec<ColumnId>) -> Self {
        self.provider.columns = columns;
        self
    }

    /// Sets the hierarchy column.
    pub fn hierarchy_column(mut self, column: ColumnId) -> Self {
        self.provider.hierarchy_column = Some(column);
        self
    }

    /// Sets the excess-width column.
    pub fn excess_width_column(mut self, column: ColumnId) -> Self {
        self.provider.excess_width_column = Some(column);
        self
    }

    /// Move rows dropped from other documents instead of copying them.
    pub fn move_between_documents(mut self, enabled: bool) -> Self {
        self.provider.move_between_documents = enabled;
        self
    }

    /// Sets the item factory.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(ItemVariant, &CloneContext) -> Option<R> + 'static,
    {
        self.provider.factory = Some(Box::new(factory));
        self
    }

    /// Accepts alt-drops of payloads with `identity`, handing them to `attach`.
    pub fn alt_drop<F>(mut self, identity: impl Into<String>, attach: F) -> Self
    where
        F: FnMut(&mut R, &DragPayload, &CloneContext) -> bool + 'static,
    {
        self.provider.alt_drop_identity = Some(identity.into());
        self.provider.attach = Some(Box::new(attach));
        self
    }

    /// Runs `hook` after rows have been dropped, copied or attached.
    pub fn post_drop<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut RecordTree<R>, &[RecordKey]) + 'static,
    {
        self.provider.post_drop = Some(Box::new(hook));
        self
    }

    /// Finishes the provider.
    pub fn build(self) -> ListProvider<R> {
        self.provider
    }
}
