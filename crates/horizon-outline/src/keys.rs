//! Slotmap keys for the entities a [`crate::Workspace`] owns.

use slotmap::new_key_type;

new_key_type! {
    /// A window. Each window may carry its own undo stack.
    pub struct WindowId;

    /// An open document (sheet, template, library file).
    ///
    /// Tables of the same document move rows instead of copying them.
    pub struct DocumentId;

    /// A table registered with the workspace.
    pub struct TableId;
}
