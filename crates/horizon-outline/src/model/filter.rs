//! Row visibility from a free-text query and required tags.

use std::collections::HashSet;

use super::cell::{CellType, ColumnId};
use super::record::Record;
use super::tree::{RecordKey, RecordTree};
use crate::logging::targets;

/// A content filter.
///
/// A record matches when the query is empty or occurs in its text, and every
/// required tag is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    query: String,
    tags: Vec<String>,
    names_only: bool,
}

impl Filter {
    /// Creates a filter. The query is matched case-insensitively.
    pub fn new(query: &str, tags: Vec<String>) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            tags: tags.into_iter().filter(|t| !t.is_empty()).collect(),
            names_only: false,
        }
    }

    /// Restricts text matching to the hierarchy column's primary text.
    pub fn with_names_only(mut self, names_only: bool) -> Self {
        self.names_only = names_only;
        self
    }

    /// The lowercased query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Required tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns true if this filter lets everything through.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.tags.is_empty()
    }

    /// Whether `record` itself matches, ignoring its descendants.
    pub fn matches<R: Record>(
        &self,
        record: &R,
        columns: &[ColumnId],
        hierarchy_column: Option<ColumnId>,
    ) -> bool {
        if !self.tags.iter().all(|tag| has_tag(record, tag)) {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        if self.names_only {
            let column = hierarchy_column.or_else(|| columns.first().copied());
            return column.is_some_and(|c| {
                record
                    .cell_data(c)
                    .primary
                    .to_lowercase()
                    .contains(&self.query)
            });
        }
        partial_match_except_tag(record, columns, &self.query)
    }

    /// Every record that should be shown: matches plus their ancestors.
    pub fn visible_set<R: Record>(
        &self,
        records: &RecordTree<R>,
        columns: &[ColumnId],
        hierarchy_column: Option<ColumnId>,
    ) -> HashSet<RecordKey> {
        let _span = tracing::debug_span!(target: targets::FILTER, "filter").entered();
        let mut visible = HashSet::new();
        // Reverse preorder visits children before their parents.
        for key in records.preorder().into_iter().rev() {
            let child_visible = records
                .children_of(Some(key))
                .iter()
                .any(|child| visible.contains(child));
            let shown = child_visible
                || records
                    .get(key)
                    .is_some_and(|r| self.matches(r, columns, hierarchy_column));
            if shown {
                visible.insert(key);
            }
        }
        tracing::debug!(
            target: targets::FILTER,
            query = %self.query,
            tags = self.tags.len(),
            visible = visible.len(),
            total = records.len(),
            "filter evaluated"
        );
        visible
    }
}

/// Case-insensitive exact tag test. An empty tag matches everything.
pub fn has_tag<R: Record>(record: &R, tag: &str) -> bool {
    tag.is_empty() || record.tags().iter().any(|t| t.to_lowercase() == tag.to_lowercase())
}

/// Returns true if `text` (already lowercased) occurs in the sort text of any
/// column that is not a tag column.
pub fn partial_match_except_tag<R: Record>(record: &R, columns: &[ColumnId], text: &str) -> bool {
    columns.iter().any(|&column| {
        let data = record.cell_data(column);
        data.cell_type != CellType::Tags && data.for_sort().to_lowercase().contains(text)
    })
}
