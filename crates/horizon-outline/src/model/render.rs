//! Cell rendering and the per-cell render cache.
//!
//! Rendering a cell means laying its text out for a given column width. The
//! result only depends on the cell's [`CellData`] and the width, so each
//! node keeps one [`CellCache`] per column and re-renders only when either
//! changes.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use super::cell::{Alignment, CellData, CellType};

/// A cell laid out for a specific width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedCell {
    /// Wrapped primary text.
    pub primary_lines: Vec<String>,
    /// Wrapped secondary text.
    pub secondary_lines: Vec<String>,
    /// Widest line, in the renderer's units.
    pub content_width: f32,
    pub alignment: Alignment,
    pub cell_type: CellType,
    pub tooltip: String,
    pub disabled: bool,
}

impl RenderedCell {
    /// Total number of laid-out lines.
    pub fn line_count(&self) -> usize {
        self.primary_lines.len() + self.secondary_lines.len()
    }
}

/// Lays out cell data for a width.
pub trait CellRenderer {
    /// Renders `data` to fit within `width`.
    fn render(&self, data: &CellData, width: f32) -> RenderedCell;
}

/// Word-wrapping text renderer with a fixed advance per grapheme.
#[derive(Debug, Clone, Copy)]
pub struct TextCellRenderer {
    grapheme_advance: f32,
}

impl Default for TextCellRenderer {
    fn default() -> Self {
        Self::new(7.0)
    }
}

impl TextCellRenderer {
    /// Creates a renderer where every grapheme is `grapheme_advance` wide.
    pub fn new(grapheme_advance: f32) -> Self {
        Self {
            grapheme_advance: grapheme_advance.max(f32::EPSILON),
        }
    }

    /// The width of a single grapheme.
    pub fn grapheme_advance(&self) -> f32 {
        self.grapheme_advance
    }

    /// Width of `text` on a single line.
    pub fn measure(&self, text: &str) -> f32 {
        text.graphemes(true).count() as f32 * self.grapheme_advance
    }

    /// Wraps `text` at word boundaries so that no line exceeds `width`.
    ///
    /// Explicit newlines always break. A word wider than `width` is split
    /// between graphemes.
    pub fn wrap(&self, text: &str, width: f32) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let max_graphemes = ((width / self.grapheme_advance).floor() as usize).max(1);
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            let mut line_len = 0usize;
            for word in paragraph.split_word_bounds() {
                let word_len = word.graphemes(true).count();
                if line_len + word_len <= max_graphemes {
                    line.push_str(word);
                    line_len += word_len;
                    continue;
                }
                if line_len > 0 {
                    lines.push(line.trim_end().to_string());
                    line.clear();
                    line_len = 0;
                }
                if word.trim().is_empty() {
                    continue;
                }
                for grapheme in word.graphemes(true) {
                    if line_len == max_graphemes {
                        lines.push(std::mem::take(&mut line));
                        line_len = 0;
                    }
                    line.push_str(grapheme);
                    line_len += 1;
                }
            }
            lines.push(line.trim_end().to_string());
        }
        lines
    }
}

impl CellRenderer for TextCellRenderer {
    fn render(&self, data: &CellData, width: f32) -> RenderedCell {
        let primary_lines = match data.cell_type {
            CellType::Toggle => vec![data.for_sort()],
            _ => self.wrap(&data.primary, width),
        };
        let secondary_lines = self.wrap(&data.secondary, width);
        let content_width = primary_lines
            .iter()
            .chain(&secondary_lines)
            .map(|line| self.measure(line))
            .fold(0.0, f32::max);
        RenderedCell {
            primary_lines,
            secondary_lines,
            content_width,
            alignment: data.alignment,
            cell_type: data.cell_type,
            tooltip: data.tooltip.clone(),
            disabled: data.disabled,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedCell {
    data: CellData,
    width: f32,
    rendered: Arc<RenderedCell>,
}

/// Memoizes the rendering of one cell.
#[derive(Debug, Clone, Default)]
pub struct CellCache {
    entry: Option<CachedCell>,
}

impl CellCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the cached rendering was made for `data` at `width`.
    pub fn matches(&self, data: &CellData, width: f32) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|entry| entry.width == width && entry.data == *data)
    }

    /// Returns the cached rendering, re-rendering first if `data` or
    /// `width` changed.
    pub fn get_or_render(
        &mut self,
        data: CellData,
        width: f32,
        renderer: &dyn CellRenderer,
    ) -> Arc<RenderedCell> {
        if let Some(entry) = &self.entry
            && entry.width == width
            && entry.data == data
        {
            return Arc::clone(&entry.rendered);
        }
        let rendered = Arc::new(renderer.render(&data, width));
        self.entry = Some(CachedCell {
            data,
            width,
            rendered: Arc::clone(&rendered),
        });
        rendered
    }

    /// Returns true if something is cached.
    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }

    /// Drops the cached rendering.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct CountingRenderer {
        calls: Cell<usize>,
    }

    impl CellRenderer for CountingRenderer {
        fn render(&self, data: &CellData, width: f32) -> RenderedCell {
            self.calls.set(self.calls.get() + 1);
            TextCellRenderer::new(1.0).render(data, width)
        }
    }

    #[test]
    fn test_wrap_at_word_boundaries() {
        let renderer = TextCellRenderer::new(1.0);
        assert_eq!(
            renderer.wrap("High Pain Threshold", 10.0),
            vec!["High Pain", "Threshold"]
        );
    }

    #[test]
    fn test_wrap_long_word_and_newline() {
        let renderer = TextCellRenderer::new(1.0);
        assert_eq!(renderer.wrap("abcdef", 4.0), vec!["abcd", "ef"]);
        assert_eq!(renderer.wrap("one\ntwo", 40.0), vec!["one", "two"]);
        assert!(renderer.wrap("", 40.0).is_empty());
    }

    #[test]
    fn test_wrap_counts_graphemes() {
        let renderer = TextCellRenderer::new(1.0);
        // "e" + combining acute accent is a single grapheme.
        assert_eq!(renderer.wrap("cafe\u{301} bar", 4.0), vec!["cafe\u{301}", "bar"]);
    }

    #[test]
    fn test_cache_hits_on_same_data_and_width() {
        let renderer = CountingRenderer {
            calls: Cell::new(0),
        };
        let mut cache = CellCache::new();
        let first = cache.get_or_render(CellData::text("Fit"), 100.0, &renderer);
        let second = cache.get_or_render(CellData::text("Fit"), 100.0, &renderer);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(renderer.calls.get(), 1);
    }

    #[test]
    fn test_cache_misses_on_change() {
        let renderer = CountingRenderer {
            calls: Cell::new(0),
        };
        let mut cache = CellCache::new();
        cache.get_or_render(CellData::text("Fit"), 100.0, &renderer);
        cache.get_or_render(CellData::text("Fit"), 80.0, &renderer);
        cache.get_or_render(CellData::text("Very Fit"), 80.0, &renderer);
        assert_eq!(renderer.calls.get(), 3);
        assert!(cache.matches(&CellData::text("Very Fit"), 80.0));

        cache.invalidate();
        assert!(!cache.is_cached());
    }
}
