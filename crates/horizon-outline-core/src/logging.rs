//! Logging and debugging facilities for Horizon Outline.
//!
//! This module provides:
//! - Target and span names for filtering `tracing` output per subsystem
//! - Text rendering of any tree through the [`TreeSource`] trait
//! - A scoped performance span
//!
//! # Tracing Integration
//!
//! Horizon Outline emits `tracing` events but never installs a subscriber.
//! Applications pick one:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_outline=debug")
//!     .init();
//! ```

use std::fmt::Write as FmtWrite;

/// Span names used throughout Horizon Outline for tracing.
pub mod span_names {
    /// Table resynchronization span.
    pub const SYNC: &str = "horizon_outline::sync";
    /// Undo/redo application span.
    pub const UNDO: &str = "horizon_outline::undo";
    /// Drop processing span.
    pub const DROP: &str = "horizon_outline::drop";
    /// Filter evaluation span.
    pub const FILTER: &str = "horizon_outline::filter";
}

/// Target names for log filtering.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_outline_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_outline_core::signal";
    /// UI queue target.
    pub const QUEUE: &str = "horizon_outline_core::queue";
    /// Background runtime target.
    pub const BACKGROUND: &str = "horizon_outline_core::background";
    /// Performance spans target.
    pub const PERF: &str = "horizon_outline::perf";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line-per-node representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to append each node's ID.
    pub show_ids: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            ..Default::default()
        }
    }

    /// Use the given style.
    pub fn with_style(mut self, style: TreeStyle) -> Self {
        self.style = style;
        self
    }
}

/// Anything that can be walked as an ordered forest of labelled nodes.
pub trait TreeSource {
    /// Node handle type.
    type Node: Copy;

    /// The top-level nodes, in order.
    fn roots(&self) -> Vec<Self::Node>;
    /// The children of `node`, in order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;
    /// Display label for `node`.
    fn label(&self, node: Self::Node) -> String;
    /// Identifier shown when [`TreeFormatOptions::show_ids`] is set.
    fn node_id(&self, node: Self::Node) -> String;
}

/// Renders a [`TreeSource`] as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeDump {
    options: TreeFormatOptions,
}

impl TreeDump {
    /// Create a dumper with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dumper with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole forest.
    pub fn format<S: TreeSource>(&self, source: &S) -> String {
        let roots = source.roots();
        let mut output = String::new();
        if roots.is_empty() {
            output.push_str("(empty)\n");
            return output;
        }
        let count = roots.len();
        for (i, root) in roots.into_iter().enumerate() {
            self.format_into(source, root, 0, i + 1 == count, &mut output);
        }
        output
    }

    fn format_into<S: TreeSource>(
        &self,
        source: &S,
        node: S::Node,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(&source.label(node));
        if self.options.show_ids {
            let _ = write!(output, " [{}]", source.node_id(node));
        }
        output.push('\n');

        let children = source.children(node);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_into(source, child, depth + 1, i + 1 == count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }
        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };
        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.extend(std::iter::repeat_n(' ', self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
