//! Cell data produced by records for each column.

use serde::{Deserialize, Serialize};

/// Identifies a column of a table.
///
/// Column IDs are chosen by the provider and stay stable across sessions so
/// that persisted widths can be matched back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub i32);

/// How a cell presents its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    /// Plain text, possibly with a secondary line.
    #[default]
    Text,
    /// A checkbox-style toggle.
    Toggle,
    /// A page reference link.
    PageRef,
    /// A comma-separated tag list.
    Tags,
}

/// Horizontal alignment of cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    #[default]
    Start,
    Middle,
    End,
}

/// The content of one cell, as reported by [`Record::cell_data`].
///
/// [`Record::cell_data`]: crate::model::Record::cell_data
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellData {
    pub cell_type: CellType,
    pub primary: String,
    pub secondary: String,
    pub tooltip: String,
    pub unsatisfied_reason: String,
    pub checked: bool,
    pub disabled: bool,
    pub alignment: Alignment,
}

impl CellData {
    /// Creates a text cell.
    pub fn text(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            ..Default::default()
        }
    }

    /// Creates a text cell aligned to the end edge (numbers).
    pub fn number(value: impl ToString) -> Self {
        Self {
            primary: value.to_string(),
            alignment: Alignment::End,
            ..Default::default()
        }
    }

    /// Creates a toggle cell.
    pub fn toggle(checked: bool) -> Self {
        Self {
            cell_type: CellType::Toggle,
            checked,
            alignment: Alignment::Middle,
            ..Default::default()
        }
    }

    /// Creates a tags cell from a tag list.
    pub fn tags(tags: &[String]) -> Self {
        Self {
            cell_type: CellType::Tags,
            primary: tags.join(", "),
            ..Default::default()
        }
    }

    /// Sets the secondary line.
    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = secondary.into();
        self
    }

    /// Sets the tooltip.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    /// The text used for sorting and text filtering.
    pub fn for_sort(&self) -> String {
        match self.cell_type {
            CellType::Text => {
                if self.secondary.is_empty() {
                    self.primary.clone()
                } else {
                    format!("{}\n{}", self.primary, self.secondary)
                }
            }
            CellType::Toggle => {
                if self.checked {
                    "\u{221a}".to_string()
                } else {
                    String::new()
                }
            }
            CellType::PageRef | CellType::Tags => self.primary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_sort_text_with_secondary() {
        let cell = CellData::text("Acrobatics").with_secondary("DX/H");
        assert_eq!(cell.for_sort(), "Acrobatics\nDX/H");
        assert_eq!(CellData::text("Acrobatics").for_sort(), "Acrobatics");
    }

    #[test]
    fn test_for_sort_toggle() {
        assert_eq!(CellData::toggle(true).for_sort(), "\u{221a}");
        assert_eq!(CellData::toggle(false).for_sort(), "");
    }

    #[test]
    fn test_tags_cell() {
        let cell = CellData::tags(&["Advantage".into(), "Mental".into()]);
        assert_eq!(cell.cell_type, CellType::Tags);
        assert_eq!(cell.for_sort(), "Advantage, Mental");
    }
}
