#![forbid(unsafe_code)]

//! Shared history state and the stack discipline over it.
//!
//! [`HistoryState`] owns two bounded stacks of [`HistoryEntry`] values. It
//! may be attached to several editors at once through a [`SharedHistory`]
//! handle; all of them funnel commits through one host scheduler, so
//! mutation order is commit order.
//!
//! # Entries are restore points
//!
//! An undo entry holds the snapshot and selection the document had right
//! before the step it stands for. Undo pops that restore point and hands it
//! back to the owning editor; the live state captured just before the
//! restore becomes the redo entry.
//!
//! ```text
//! edit A, edit B (spaced beyond the merge window)
//! ┌──────────────────────────────────────────────┐
//! │ Undo: [before-A, before-B]   Redo: []        │
//! └──────────────────────────────────────────────┘
//! undo()
//! ┌──────────────────────────────────────────────┐
//! │ Undo: [before-A]             Redo: [after-B] │
//! └──────────────────────────────────────────────┘
//! edit C  <-- new branch, clears redo
//! ┌──────────────────────────────────────────────┐
//! │ Undo: [before-A, before-C]   Redo: []        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. `undo_stack.len() <= max_depth` after every operation.
//! 2. Recording a transition (push or coalesce) empties the redo stack.
//! 3. An entry moves between stacks only through undo/redo, and only after
//!    the host confirmed the restore.
//! 4. Undo, redo and clear reset the merge timestamp, so the next edit never
//!    coalesces with an entry from before them.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::attach::Registration;
use crate::clock::{HistoryClock, MonotonicClock};
use crate::config::HistoryConfig;
use crate::dirty::DocumentSnapshot;
use crate::host::{EditorId, HistoryHost, HostRef};
use crate::selection::Selection;

/// One undoable or redoable unit.
#[derive(Debug, Clone)]
pub struct HistoryEntry<S> {
    snapshot: S,
    selection: Option<Selection>,
    editor: EditorId,
    /// Selection after the newest step folded into this entry. Written on
    /// push, coalesce and selection-only commits; the engine never reads it
    /// back. Hosts consume it (e.g. to place the caret on redo).
    trailing_selection: Option<Selection>,
}

impl<S> HistoryEntry<S> {
    /// Restore point for `editor`: `snapshot` plus the selection to apply
    /// with it.
    #[must_use]
    pub fn new(editor: EditorId, snapshot: S, selection: Option<Selection>) -> Self {
        Self {
            snapshot,
            selection,
            editor,
            trailing_selection: None,
        }
    }

    /// Attach the selection the recorded step left behind.
    #[must_use]
    pub fn with_trailing_selection(mut self, selection: Option<Selection>) -> Self {
        self.trailing_selection = selection;
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }

    /// Selection restored together with [`snapshot`](Self::snapshot).
    #[must_use]
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn editor(&self) -> EditorId {
        self.editor
    }

    /// Latest selection observed after the recorded step. For hosts only:
    /// the engine never applies it on restore.
    #[must_use]
    pub fn trailing_selection(&self) -> Option<&Selection> {
        self.trailing_selection.as_ref()
    }
}

/// How a material transition is allowed to land on the undo stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordMode {
    /// Coalesce only inside the merge window and for the same editor.
    Timed,
    /// Always push.
    ForceNew,
    /// Coalesce whenever there is a top entry.
    ForceMerge,
}

/// Effect of one committed transition on the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Tagged skip-history; nothing looked at.
    Skipped,
    /// Classified as no observable change.
    Ignored,
    /// Selection-only; trailing selection of the top entry refreshed.
    SelectionRefreshed,
    /// Selection-only with nothing to refresh.
    SelectionIgnored,
    /// New undo entry.
    Pushed,
    /// Folded into the top entry.
    Coalesced,
}

impl CommitOutcome {
    /// Whether the stacks changed.
    #[must_use]
    pub fn mutated_stacks(self) -> bool {
        matches!(self, Self::Pushed | Self::Coalesced)
    }
}

/// Both stacks plus the bookkeeping shared by every attached editor.
///
/// Only reachable through a [`SharedHistory`] handle; read it with
/// [`SharedHistory::state`].
pub struct HistoryState<S: DocumentSnapshot> {
    /// Restore points available for undo (newest at back).
    undo_stack: VecDeque<HistoryEntry<S>>,
    /// Restore points available for redo (newest at back).
    redo_stack: VecDeque<HistoryEntry<S>>,
    max_depth: usize,
    /// Clock reading of the last push or coalesce, if any since the last
    /// undo/redo/clear.
    last_material_edit: Option<Duration>,
    clock: Rc<dyn HistoryClock>,
    /// Restore targets, by editor. Kept after detach so entries from a
    /// detached but living editor stay undoable.
    editors: HashMap<EditorId, HostRef<S>>,
    pub(crate) attachments: HashMap<EditorId, Rc<Registration<S>>>,
}

impl<S: DocumentSnapshot> fmt::Debug for HistoryState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryState")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("max_depth", &self.max_depth)
            .field("last_material_edit", &self.last_material_edit)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

impl<S: DocumentSnapshot> HistoryState<S> {
    #[must_use]
    pub(crate) fn new(config: &HistoryConfig, clock: Rc<dyn HistoryClock>) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: config.max_depth.max(1),
            last_material_edit: None,
            clock,
            editors: HashMap::new(),
            attachments: HashMap::new(),
        }
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Entry the next undo would restore.
    #[must_use]
    pub fn peek_undo(&self) -> Option<&HistoryEntry<S>> {
        self.undo_stack.back()
    }

    /// Entry the next redo would restore.
    #[must_use]
    pub fn peek_redo(&self) -> Option<&HistoryEntry<S>> {
        self.redo_stack.back()
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry<S>> {
        self.undo_stack.iter()
    }

    /// Redo entries, oldest first.
    pub fn redo_entries(&self) -> impl Iterator<Item = &HistoryEntry<S>> {
        self.redo_stack.iter()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[must_use]
    pub fn last_material_edit(&self) -> Option<Duration> {
        self.last_material_edit
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now_mono()
    }

    // ====================================================================
    // Recording
    // ====================================================================

    /// Push `entry` or fold it into the top entry, then clear redo.
    pub(crate) fn record_material(
        &mut self,
        entry: HistoryEntry<S>,
        now: Duration,
        merge_window: Duration,
        mode: RecordMode,
    ) -> CommitOutcome {
        let coalesce = match mode {
            RecordMode::ForceNew => false,
            RecordMode::ForceMerge => !self.undo_stack.is_empty(),
            RecordMode::Timed => self.within_merge_window(entry.editor, now, merge_window),
        };

        let outcome = match self.undo_stack.back_mut() {
            Some(top) if coalesce => {
                // The top entry keeps its restore point: undo returns to the
                // state before the first edit of the burst.
                top.trailing_selection = entry.trailing_selection;
                CommitOutcome::Coalesced
            }
            _ => {
                self.undo_stack.push_back(entry);
                self.enforce_depth();
                CommitOutcome::Pushed
            }
        };

        self.last_material_edit = Some(now);
        self.redo_stack.clear();
        outcome
    }

    /// Refresh the trailing selection of the top entry if `editor` owns it.
    pub(crate) fn refresh_selection(&mut self, editor: EditorId, selection: Option<Selection>) -> CommitOutcome {
        match self.undo_stack.back_mut() {
            Some(top) if top.editor == editor => {
                top.trailing_selection = selection;
                CommitOutcome::SelectionRefreshed
            }
            _ => CommitOutcome::SelectionIgnored,
        }
    }

    fn within_merge_window(&self, editor: EditorId, now: Duration, merge_window: Duration) -> bool {
        let (Some(top), Some(last)) = (self.undo_stack.back(), self.last_material_edit) else {
            return false;
        };
        top.editor == editor && now.saturating_sub(last) < merge_window
    }

    // ====================================================================
    // Undo / redo, two-phase
    // ====================================================================

    pub(crate) fn take_undo(&mut self) -> Option<HistoryEntry<S>> {
        self.undo_stack.pop_back()
    }

    /// Restore failed: the popped entry goes back untouched.
    pub(crate) fn abort_undo(&mut self, entry: HistoryEntry<S>) {
        self.undo_stack.push_back(entry);
    }

    /// Restore succeeded: commit the pending redo entry.
    pub(crate) fn complete_undo(&mut self, redo_entry: HistoryEntry<S>) {
        self.redo_stack.push_back(redo_entry);
        self.last_material_edit = None;
    }

    pub(crate) fn take_redo(&mut self) -> Option<HistoryEntry<S>> {
        self.redo_stack.pop_back()
    }

    pub(crate) fn abort_redo(&mut self, entry: HistoryEntry<S>) {
        self.redo_stack.push_back(entry);
    }

    /// Redo is not a new edit: the redo stack is left as is.
    pub(crate) fn complete_redo(&mut self, undo_entry: HistoryEntry<S>) {
        self.undo_stack.push_back(undo_entry);
        self.enforce_depth();
        self.last_material_edit = None;
    }

    // ====================================================================
    // Maintenance
    // ====================================================================

    /// Empty both stacks and forget the merge timestamp.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.last_material_edit = None;
    }

    fn enforce_depth(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    // ====================================================================
    // Editors
    // ====================================================================

    pub(crate) fn register_editor(&mut self, editor: EditorId, host: HostRef<S>) {
        self.editors.insert(editor, host);
    }

    /// Live handle for `editor`, if it is known and still alive.
    pub(crate) fn editor(&self, editor: EditorId) -> Option<Rc<dyn HistoryHost<Snapshot = S>>> {
        self.editors.get(&editor).and_then(|weak| weak.upgrade())
    }

    /// Live hosts with an active attachment, ordered by editor id.
    pub(crate) fn attached_hosts(&self) -> Vec<Rc<dyn HistoryHost<Snapshot = S>>> {
        let mut live: Vec<_> = self
            .attachments
            .iter()
            .filter(|(_, reg)| !reg.is_detached())
            .filter_map(|(id, reg)| reg.host().map(|host| (*id, host)))
            .collect();
        live.sort_by_key(|(id, _)| *id);
        live.into_iter().map(|(_, host)| host).collect()
    }

    /// Whether `editor` is attached and alive.
    #[must_use]
    pub fn is_attached(&self, editor: EditorId) -> bool {
        self.attachments
            .get(&editor)
            .is_some_and(|reg| !reg.is_detached() && reg.host().is_some())
    }
}

/// Reference-shared handle to one [`HistoryState`].
///
/// Cloning the handle shares the same stacks; pass clones to every
/// [`attach`](crate::attach) call that should share one undo history.
pub struct SharedHistory<S: DocumentSnapshot> {
    pub(crate) state: Rc<RefCell<HistoryState<S>>>,
}

impl<S: DocumentSnapshot> Clone for SharedHistory<S> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<S: DocumentSnapshot> fmt::Debug for SharedHistory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.state.borrow(), f)
    }
}

impl<S: DocumentSnapshot> Default for SharedHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DocumentSnapshot> SharedHistory<S> {
    /// Empty history with default depth and the monotonic clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&HistoryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &HistoryConfig) -> Self {
        Self::with_clock(config, Rc::new(MonotonicClock::new()))
    }

    /// Empty history reading time from `clock`.
    #[must_use]
    pub fn with_clock(config: &HistoryConfig, clock: Rc<dyn HistoryClock>) -> Self {
        Self {
            state: Rc::new(RefCell::new(HistoryState::new(config, clock))),
        }
    }

    /// Borrow the state for inspection.
    ///
    /// # Panics
    ///
    /// Panics if called while the history is being mutated, i.e. from inside
    /// a host callback that history itself triggered.
    #[must_use]
    pub fn state(&self) -> Ref<'_, HistoryState<S>> {
        self.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, HistoryState<S>> {
        self.state.borrow_mut()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.state().undo_depth()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.state().redo_depth()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.state().can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.state().can_redo()
    }

    /// Editor of every undo entry, oldest first.
    #[must_use]
    pub fn undo_editors(&self) -> Vec<EditorId> {
        self.state().undo_entries().map(HistoryEntry::editor).collect()
    }

    /// Editor of every redo entry, oldest first.
    #[must_use]
    pub fn redo_editors(&self) -> Vec<EditorId> {
        self.state().redo_entries().map(HistoryEntry::editor).collect()
    }

    #[must_use]
    pub fn is_attached(&self, editor: EditorId) -> bool {
        self.state().is_attached(editor)
    }
}

/// Fresh history state with empty stacks and default configuration.
#[must_use]
pub fn create_empty_history_state<S: DocumentSnapshot>() -> SharedHistory<S> {
    SharedHistory::new()
}
