//! The workspace context.
//!
//! A [`Workspace`] owns every window, document and table of an application
//! together with the shared settings, the UI queue and the background
//! runtime. It is passed explicitly to every operation; there is no global
//! state.
//!
//! # Windows, Documents and Tables
//!
//! Windows own undo stacks (optional) and a [`ViewGuard`]. Documents group
//! tables: rows dragged between tables of the same document move, while rows
//! dragged between documents are copied. Tables are stored type-erased and
//! recovered with [`Workspace::table`] / [`Workspace::table_mut`].
//!
//! # Undoable Edits
//!
//! ```ignore
//! let edit = workspace.prepare_edit("Rename", window, &[table]);
//! if let Some(t) = workspace.table_mut::<MyProvider>(table) {
//!     // mutate records
//!     t.sync_to_model();
//! }
//! workspace.finalize_edit(edit);
//! ```

mod erased;

use std::future::Future;

use slotmap::SlotMap;
use tokio::task::JoinHandle;

use horizon_outline_core::{
    BackgroundConfig, BackgroundRuntime, DeliveryOutcome, UiPoster, UiQueue, ViewGuard, ViewToken,
};

pub(crate) use erased::AnyTable;

use crate::drag::{DragPayload, DropOutcome, DropRejection, DropTarget};
use crate::error::{OutlineError, Result};
use crate::keys::{DocumentId, TableId, WindowId};
use crate::logging::{PerfSpan, targets};
use crate::model::{CloneContext, Record, RecordId, RecordKey};
use crate::ops::EditorRegistry;
use crate::provider::{TableProvider, TableRef};
use crate::settings::OutlineSettings;
use crate::table::Table;
use crate::undo::{EditorSession, PreparedEdit, TableSnapshot, UndoEdit, UndoEntry, UndoManager};

/// Undo name of row drops.
pub const DRAG_AND_DROP_EDIT: &str = "Row Drag & Drop";

struct WindowEntry {
    title: String,
    undo: Option<UndoManager>,
    guard: ViewGuard,
}

struct DocumentEntry {
    name: String,
    window: WindowId,
}

pub(crate) struct TableEntry {
    pub(crate) table: Box<dyn AnyTable>,
    pub(crate) window: WindowId,
    pub(crate) document: Option<DocumentId>,
}

/// Owns windows, documents and tables.
pub struct Workspace {
    windows: SlotMap<WindowId, WindowEntry>,
    documents: SlotMap<DocumentId, DocumentEntry>,
    pub(crate) tables: SlotMap<TableId, TableEntry>,
    settings: OutlineSettings,
    queue: UiQueue<Workspace>,
    background: Option<BackgroundRuntime>,
    pub(crate) editors: Option<Box<dyn EditorRegistry>>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(OutlineSettings::default())
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("windows", &self.windows.len())
            .field("documents", &self.documents.len())
            .field("tables", &self.tables.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Creates an empty workspace.
    pub fn new(settings: OutlineSettings) -> Self {
        Self {
            windows: SlotMap::with_key(),
            documents: SlotMap::with_key(),
            tables: SlotMap::with_key(),
            settings,
            queue: UiQueue::new(),
            background: None,
            editors: None,
        }
    }

    /// Shared settings.
    pub fn settings(&self) -> &OutlineSettings {
        &self.settings
    }

    /// Replaces the settings. Undo limits of open windows follow.
    pub fn set_settings(&mut self, settings: OutlineSettings) {
        for window in self.windows.values_mut() {
            if let Some(undo) = window.undo.as_mut() {
                undo.set_limit(settings.undo_limit);
            }
        }
        self.settings = settings;
    }

    /// Installs the registry consulted before deleting rows with open editors.
    pub fn set_editor_registry(&mut self, registry: impl EditorRegistry + 'static) {
        self.editors = Some(Box::new(registry));
    }

    // =========================================================================
    // Windows, documents, tables
    // =========================================================================

    /// Opens a window, optionally with its own undo stack.
    pub fn add_window(&mut self, title: impl Into<String>, with_undo: bool) -> WindowId {
        let title = title.into();
        let undo = with_undo.then(|| UndoManager::new(self.settings.undo_limit));
        let id = self.windows.insert(WindowEntry {
            title,
            undo,
            guard: ViewGuard::new(),
        });
        tracing::debug!(target: targets::WORKSPACE, ?id, with_undo, "window added");
        id
    }

    /// Title of a window.
    pub fn window_title(&self, window: WindowId) -> Option<&str> {
        self.windows.get(window).map(|w| w.title.as_str())
    }

    /// Closes a window with its documents and tables.
    ///
    /// Background results still in flight for the window are discarded.
    pub fn close_window(&mut self, window: WindowId) -> bool {
        let Some(entry) = self.windows.remove(window) else {
            return false;
        };
        entry.guard.close();
        self.tables.retain(|_, table| table.window != window);
        self.documents.retain(|_, document| document.window != window);
        tracing::debug!(target: targets::WORKSPACE, ?window, "window closed");
        true
    }

    /// Opens a document inside a window.
    pub fn add_document(&mut self, window: WindowId, name: impl Into<String>) -> Result<DocumentId> {
        if !self.windows.contains_key(window) {
            return Err(OutlineError::unknown("window"));
        }
        Ok(self.documents.insert(DocumentEntry {
            name: name.into(),
            window,
        }))
    }

    /// Name of a document.
    pub fn document_name(&self, document: DocumentId) -> Option<&str> {
        self.documents.get(document).map(|d| d.name.as_str())
    }

    /// Registers a table for `provider` in `window`, optionally as part of
    /// `document`.
    pub fn add_table<P: TableProvider>(
        &mut self,
        window: WindowId,
        document: Option<DocumentId>,
        provider: P,
    ) -> Result<TableId> {
        if !self.windows.contains_key(window) {
            return Err(OutlineError::unknown("window"));
        }
        if let Some(document) = document {
            match self.documents.get(document) {
                None => return Err(OutlineError::unknown("document")),
                Some(entry) if entry.window != window => {
                    return Err(OutlineError::contract(
                        "document belongs to another window",
                    ));
                }
                Some(_) => {}
            }
        }
        let table = Table::new(provider, &self.settings);
        let id = self.tables.insert(TableEntry {
            table: Box::new(table),
            window,
            document,
        });
        tracing::debug!(
            target: targets::WORKSPACE,
            ?id,
            provider = std::any::type_name::<P>(),
            "table added"
        );
        Ok(id)
    }

    /// Removes a table.
    pub fn close_table(&mut self, table: TableId) -> bool {
        self.tables.remove(table).is_some()
    }

    /// Returns true if the table is open.
    pub fn contains_table(&self, table: TableId) -> bool {
        self.tables.contains_key(table)
    }

    /// The table as `Table<P>`, or `None` if it is gone or holds another
    /// provider type.
    pub fn table<P: TableProvider>(&self, table: TableId) -> Option<&Table<P>> {
        self.try_table(table)
            .inspect_err(|err| tracing::error!(target: targets::WORKSPACE, ?table, error = %err, "table lookup failed"))
            .ok()
    }

    /// Mutable variant of [`table`](Self::table).
    pub fn table_mut<P: TableProvider>(&mut self, table: TableId) -> Option<&mut Table<P>> {
        self.try_table_mut(table)
            .inspect_err(|err| tracing::error!(target: targets::WORKSPACE, ?table, error = %err, "table lookup failed"))
            .ok()
    }

    /// The table as `Table<P>`, reporting why the lookup failed.
    pub fn try_table<P: TableProvider>(&self, table: TableId) -> Result<&Table<P>> {
        let entry = self
            .tables
            .get(table)
            .ok_or_else(|| OutlineError::unknown("table"))?;
        let provider_type = entry.table.provider_type();
        entry.table.as_any().downcast_ref::<Table<P>>().ok_or_else(|| {
            OutlineError::contract(format!(
                "table holds {provider_type}, not {}",
                std::any::type_name::<P>()
            ))
        })
    }

    /// Mutable variant of [`try_table`](Self::try_table).
    pub fn try_table_mut<P: TableProvider>(&mut self, table: TableId) -> Result<&mut Table<P>> {
        let entry = self
            .tables
            .get_mut(table)
            .ok_or_else(|| OutlineError::unknown("table"))?;
        let provider_type = entry.table.provider_type();
        entry.table.as_any_mut().downcast_mut::<Table<P>>().ok_or_else(|| {
            OutlineError::contract(format!(
                "table holds {provider_type}, not {}",
                std::any::type_name::<P>()
            ))
        })
    }

    /// The table and its owning document.
    pub fn table_ref(&self, table: TableId) -> Result<TableRef> {
        self.tables
            .get(table)
            .map(|entry| TableRef {
                table,
                document: entry.document,
            })
            .ok_or_else(|| OutlineError::unknown("table"))
    }

    /// The window showing a table.
    pub fn window_of(&self, table: TableId) -> Result<WindowId> {
        self.tables
            .get(table)
            .map(|entry| entry.window)
            .ok_or_else(|| OutlineError::unknown("table"))
    }

    /// The undo stack of a window.
    pub fn undo_manager(&self, window: WindowId) -> Option<&UndoManager> {
        self.windows.get(window)?.undo.as_ref()
    }

    /// Mutable access to the undo stack of a window.
    pub fn undo_manager_mut(&mut self, window: WindowId) -> Option<&mut UndoManager> {
        self.windows.get_mut(window)?.undo.as_mut()
    }

    fn has_undo(&self, window: WindowId) -> bool {
        self.undo_manager(window).is_some()
    }

    /// Liveness token of a window.
    pub fn view_token(&self, window: WindowId) -> Result<ViewToken> {
        self.windows
            .get(window)
            .map(|w| w.guard.token())
            .ok_or_else(|| OutlineError::unknown("window"))
    }

    pub(crate) fn clone_context(&self, source: TableRef, dest: TableId) -> CloneContext {
        CloneContext {
            source: source.document,
            owner: self.tables.get(dest).and_then(|entry| entry.document),
        }
    }

    pub(crate) fn entry_mut(&mut self, table: TableId) -> Result<&mut TableEntry> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| OutlineError::unknown("table"))
    }

    // =========================================================================
    // UI queue and background work
    // =========================================================================

    /// A handle other threads use to post work to this workspace.
    pub fn poster(&self) -> UiPoster<Workspace> {
        self.queue.poster()
    }

    /// Number of posted invocations waiting to run.
    pub fn pending_posts(&self) -> usize {
        self.queue.pending_count()
    }

    /// Runs everything posted since the last call. Returns the number of
    /// invocations that executed.
    pub fn process_posted(&mut self) -> usize {
        let pending = self.queue.take_pending();
        let mut executed = 0;
        for invocation in pending {
            if invocation.execute(self) {
                executed += 1;
            }
        }
        executed
    }

    /// The background runtime, started on first use.
    pub fn background(&mut self) -> Result<&BackgroundRuntime> {
        if self.background.is_none() {
            let config = BackgroundConfig::default()
                .with_thread_name("horizon-outline-background")
                .with_default_timeout(self.settings.background_timeout());
            self.background = Some(BackgroundRuntime::new(config)?);
        }
        self.background
            .as_ref()
            .ok_or_else(|| OutlineError::unknown("background runtime"))
    }

    /// Runs `future` in the background and applies its result through
    /// `deliver` on the next [`process_posted`](Self::process_posted).
    ///
    /// The result is dropped if it takes longer than the configured timeout
    /// or `window` closes first.
    pub fn spawn_background<F, T, D>(
        &mut self,
        window: WindowId,
        future: F,
        deliver: D,
    ) -> Result<JoinHandle<DeliveryOutcome>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        D: FnOnce(&mut Workspace, T) + Send + 'static,
    {
        let target = self.view_token(window)?;
        let poster = self.queue.poster();
        let runtime = self.background()?;
        Ok(runtime.deliver_default(poster, target, future, deliver))
    }

    // =========================================================================
    // Undo
    // =========================================================================

    /// Snapshots `tables` before a mutation.
    ///
    /// Returns `None` (and the mutation proceeds without undo) when `window`
    /// has no undo manager or a snapshot fails.
    pub fn prepare_edit(
        &self,
        name: impl Into<String>,
        window: WindowId,
        tables: &[TableId],
    ) -> Option<PreparedEdit> {
        if !self.has_undo(window) {
            return None;
        }
        let mut before = Vec::with_capacity(tables.len());
        for &table in tables {
            let Some(entry) = self.tables.get(table) else {
                tracing::error!(target: targets::UNDO, ?table, "cannot snapshot unknown table");
                return None;
            };
            match entry.table.snapshot(table) {
                Ok(snapshot) => before.push(snapshot),
                Err(err) => {
                    tracing::warn!(target: targets::UNDO, ?table, error = %err, "snapshot failed, edit will not be undoable");
                    return None;
                }
            }
        }
        Some(PreparedEdit {
            name: name.into(),
            window,
            before,
        })
    }

    /// Snapshots the tables again and pushes the edit.
    ///
    /// Nothing is pushed if every table is unchanged. Returns true if an
    /// edit was pushed.
    pub fn finalize_edit(&mut self, prepared: Option<PreparedEdit>) -> bool {
        let Some(prepared) = prepared else {
            return false;
        };
        let mut entries = Vec::with_capacity(prepared.before.len());
        for before in prepared.before {
            let Some(entry) = self.tables.get(before.table) else {
                tracing::debug!(target: targets::UNDO, table = ?before.table, "table closed during edit");
                continue;
            };
            match entry.table.snapshot(before.table) {
                Ok(after) => entries.push(UndoEntry { before, after }),
                Err(err) => {
                    tracing::warn!(target: targets::UNDO, error = %err, "snapshot failed, edit not recorded");
                    return false;
                }
            }
        }
        if entries.iter().all(|entry| entry.before == entry.after) {
            tracing::trace!(target: targets::UNDO, name = %prepared.name, "edit changed nothing");
            return false;
        }
        let Some(manager) = self.undo_manager_mut(prepared.window) else {
            return false;
        };
        tracing::debug!(target: targets::UNDO, name = %prepared.name, tables = entries.len(), "edit recorded");
        manager.push(UndoEdit::new(prepared.name, entries));
        true
    }

    /// Reverts the most recent edit of `window`. Returns false if there was
    /// nothing to undo.
    ///
    /// The stack only steps back once every snapshot has been restored.
    pub fn undo(&mut self, window: WindowId) -> Result<bool> {
        let Some(edit) = self.pending_edit(window, UndoManager::next_undo)? else {
            return Ok(false);
        };
        let _perf = PerfSpan::new("undo");
        tracing::debug!(target: targets::UNDO, name = edit.name(), "undo");
        self.apply_snapshots(edit.entries().iter().map(|entry| &entry.before))?;
        if let Some(manager) = self.undo_manager_mut(window) {
            manager.undo();
        }
        Ok(true)
    }

    /// Reapplies the most recently undone edit of `window`.
    pub fn redo(&mut self, window: WindowId) -> Result<bool> {
        let Some(edit) = self.pending_edit(window, UndoManager::next_redo)? else {
            return Ok(false);
        };
        let _perf = PerfSpan::new("redo");
        tracing::debug!(target: targets::UNDO, name = edit.name(), "redo");
        self.apply_snapshots(edit.entries().iter().map(|entry| &entry.after))?;
        if let Some(manager) = self.undo_manager_mut(window) {
            manager.redo();
        }
        Ok(true)
    }

    fn pending_edit(
        &self,
        window: WindowId,
        peek: fn(&UndoManager) -> Option<&UndoEdit>,
    ) -> Result<Option<UndoEdit>> {
        let entry = self
            .windows
            .get(window)
            .ok_or_else(|| OutlineError::unknown("window"))?;
        Ok(entry.undo.as_ref().and_then(peek).cloned())
    }

    /// Restores every snapshot, or none of them: a failure puts the tables
    /// already restored back the way they were.
    fn apply_snapshots<'a>(&mut self, snapshots: impl Iterator<Item = &'a TableSnapshot>) -> Result<()> {
        let mut previous: Vec<TableSnapshot> = Vec::new();
        for snapshot in snapshots {
            let Some(entry) = self.tables.get_mut(snapshot.table) else {
                tracing::debug!(target: targets::UNDO, table = ?snapshot.table, "skipping closed table");
                continue;
            };
            previous.push(entry.table.snapshot(snapshot.table)?);
            if let Err(err) = entry.table.restore(snapshot) {
                tracing::warn!(target: targets::UNDO, table = ?snapshot.table, %err, "restore failed, rolling back");
                self.roll_back(&previous);
                return Err(err);
            }
        }
        Ok(())
    }

    fn roll_back(&mut self, previous: &[TableSnapshot]) {
        for snapshot in previous.iter().rev() {
            if let Some(entry) = self.tables.get_mut(snapshot.table)
                && let Err(err) = entry.table.restore(snapshot)
            {
                tracing::error!(target: targets::UNDO, table = ?snapshot.table, %err, "rollback failed");
            }
        }
    }

    /// Starts editing a copy of the record `id`.
    pub fn open_editor<P: TableProvider>(
        &self,
        table: TableId,
        id: &RecordId,
    ) -> Option<EditorSession<P::Record>> {
        let document = self.tables.get(table)?.document;
        let ctx = CloneContext {
            source: document,
            owner: document,
        };
        let t = self.table::<P>(table)?;
        let records = t.records();
        let record = records.get(records.key_of(id)?)?;
        Some(EditorSession::new(table, record.duplicate(&ctx, true)))
    }

    /// Commits an editor session as one undoable edit. Returns true if an
    /// edit was recorded.
    pub fn apply_editor<P: TableProvider>(&mut self, session: EditorSession<P::Record>) -> Result<bool> {
        let window = self.window_of(session.table)?;
        let key = self
            .try_table::<P>(session.table)?
            .records()
            .key_of(&session.target)
            .ok_or_else(|| OutlineError::unknown("record"))?;
        let prepared = self.prepare_edit(session.edit_name(), window, &[session.table]);
        let t = self.try_table_mut::<P>(session.table)?;
        t.provider_mut()
            .records_mut()
            .replace_record(key, session.draft)?;
        t.sync_to_model();
        Ok(self.finalize_edit(prepared))
    }

    // =========================================================================
    // Drag and drop
    // =========================================================================

    /// Captures the top-most selected rows of `table` for dragging.
    pub fn start_drag(&mut self, table: TableId) -> Option<DragPayload> {
        let source = self.table_ref(table).ok()?;
        let payload = self.tables.get_mut(table)?.table.capture_drag(source)?;
        tracing::debug!(target: targets::DRAG, ?table, count = payload.count(), "drag started");
        Some(payload)
    }

    /// Drops `payload` onto `dest` at `target`, or at the insertion point
    /// when no target is given.
    ///
    /// Rows move when the provider says so (same table or same document by
    /// default) and are copied with new IDs otherwise. The change is a single
    /// undo edit in the destination's window covering both tables.
    pub fn drop_rows(
        &mut self,
        dest: TableId,
        payload: &DragPayload,
        target: Option<DropTarget>,
    ) -> Result<DropOutcome> {
        let _perf = PerfSpan::new("drop_rows");
        let dest_ref = self.table_ref(dest)?;
        let dest_window = self.window_of(dest)?;
        let source = payload.source();

        let entry = self.entry_mut(dest)?;
        if !entry.table.accepts(payload) {
            return Err(reject(DropRejection::IdentityMismatch));
        }
        if entry.table.is_filtered() {
            return Err(reject(DropRejection::Filtered));
        }
        let moved = entry.table.drop_should_move(source, dest_ref);
        let same_table = source.table == dest;
        let target = match target {
            Some(target) => target,
            None => entry.table.insertion_point(),
        };

        if moved && !same_table {
            let Some(source_entry) = self.tables.get(source.table) else {
                return Err(reject(DropRejection::SourceGone));
            };
            if self.has_undo(source_entry.window) && !self.has_undo(dest_window) {
                return Err(reject(DropRejection::NoUndoManager));
            }
        }

        let entry = self.entry_mut(dest)?;
        if !entry.table.is_valid_target(target) {
            return Err(reject(DropRejection::InvalidTarget));
        }
        let same_table_keys = if moved && same_table {
            let keys = entry
                .table
                .keys_for(payload)
                .ok_or_else(|| reject(DropRejection::SourceGone))?;
            if entry.table.would_nest(&keys, target) {
                return Err(reject(DropRejection::IntoOwnSubtree));
            }
            Some(keys)
        } else {
            None
        };

        let covered = if moved && !same_table {
            vec![dest, source.table]
        } else {
            vec![dest]
        };
        let prepared = self.prepare_edit(DRAG_AND_DROP_EDIT, dest_window, &covered);
        let ctx = self.clone_context(source, dest);

        let entry = self.entry_mut(dest)?;
        let inserted = match same_table_keys {
            Some(keys) => entry.table.move_rows(&keys, target)?,
            None => entry.table.insert_payload(payload, target, moved, &ctx)?,
        };
        let ids = entry.table.finish_drop(&inserted);

        if moved && !same_table {
            let source_entry = self.entry_mut(source.table)?;
            let removed = source_entry.table.remove_payload_rows(payload);
            source_entry.table.sync();
            tracing::debug!(target: targets::DRAG, removed, "removed moved rows from source");
        }

        tracing::debug!(
            target: targets::DRAG,
            ?dest,
            moved,
            count = ids.len(),
            "rows dropped"
        );
        self.finalize_edit(prepared);
        Ok(DropOutcome {
            moved,
            inserted: ids,
        })
    }

    /// Attaches the payload's records to the row `row` of `dest` through the
    /// provider's alt-drop hook. Returns true if the row changed.
    pub fn alt_drop(&mut self, dest: TableId, payload: &DragPayload, row: RecordKey) -> Result<bool> {
        let window = self.window_of(dest)?;
        let ctx = self.clone_context(payload.source(), dest);
        let entry = self.entry_mut(dest)?;
        if entry.table.alt_drop_identity() != Some(payload.identity()) {
            return Err(reject(DropRejection::IdentityMismatch));
        }
        if entry.table.is_filtered() {
            return Err(reject(DropRejection::Filtered));
        }
        if !entry.table.contains(row) {
            return Err(reject(DropRejection::InvalidTarget));
        }
        let prepared = self.prepare_edit(DRAG_AND_DROP_EDIT, window, &[dest]);
        let changed = self.entry_mut(dest)?.table.alt_drop(row, payload, &ctx)?;
        if changed {
            tracing::debug!(target: targets::DRAG, ?dest, count = payload.count(), "rows attached");
            self.finalize_edit(prepared);
        }
        Ok(changed)
    }
}

fn reject(rejection: DropRejection) -> OutlineError {
    tracing::debug!(target: targets::DRAG, %rejection, "drop rejected");
    rejection.into()
}
