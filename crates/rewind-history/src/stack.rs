#![forbid(unsafe_code)]

//! Undo, redo and clear against the host.
//!
//! Undo and redo are two-phase: the entry is popped, the owning editor is
//! asked to restore it, and only a confirmed restore commits the move to the
//! other stack. A failed restore puts the entry back, reports the error to
//! the host, and leaves both stacks exactly as they were.
//!
//! No history borrow is held across a host call, so the restore's own commit
//! (tagged skip-history) can reach the change listener safely.

use tracing::{debug, debug_span, warn};

use crate::dirty::DocumentSnapshot;
use crate::error::HistoryError;
use crate::host::{DocumentEngine, EditorId, HistoryHost};
use crate::state::{HistoryEntry, SharedHistory};
use crate::transition::TagSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

impl<S: DocumentSnapshot> SharedHistory<S> {
    /// Restore the newest undo entry.
    ///
    /// `via` is the editor the request came through; it provides the
    /// active-editor context and receives the error report on failure.
    ///
    /// # Returns
    ///
    /// - `None` if there is nothing to undo
    /// - `Some(Ok(editor))` with the editor that was restored
    /// - `Some(Err(error))` if the restore failed (stacks unchanged)
    pub fn undo(&self, via: &dyn HistoryHost<Snapshot = S>) -> Option<Result<EditorId, HistoryError>> {
        let entry = self.state_mut().take_undo()?;
        Some(self.finish(Direction::Undo, entry, via))
    }

    /// Restore the newest redo entry. Symmetric to [`undo`](Self::undo).
    pub fn redo(&self, via: &dyn HistoryHost<Snapshot = S>) -> Option<Result<EditorId, HistoryError>> {
        let entry = self.state_mut().take_redo()?;
        Some(self.finish(Direction::Redo, entry, via))
    }

    /// Empty both stacks and emit the (now false) availability signals.
    pub fn clear(&self) {
        self.state_mut().clear();
        debug!(target: "rewind.history", "history cleared");
        self.emit_signals();
    }

    fn finish(
        &self,
        direction: Direction,
        entry: HistoryEntry<S>,
        via: &dyn HistoryHost<Snapshot = S>,
    ) -> Result<EditorId, HistoryError> {
        let editor = entry.editor();
        match self.restore_entry(direction, &entry, via) {
            Ok(pending) => {
                {
                    let mut state = self.state_mut();
                    match direction {
                        Direction::Undo => state.complete_undo(pending),
                        Direction::Redo => state.complete_redo(pending),
                    }
                }
                {
                    let state = self.state();
                    debug!(
                        target: "rewind.history",
                        direction = direction.as_str(),
                        editor = editor.raw(),
                        undo_depth = state.undo_depth(),
                        redo_depth = state.redo_depth(),
                        "history step restored"
                    );
                }
                self.emit_signals();
                Ok(editor)
            }
            Err(error) => {
                {
                    let mut state = self.state_mut();
                    match direction {
                        Direction::Undo => state.abort_undo(entry),
                        Direction::Redo => state.abort_redo(entry),
                    }
                }
                warn!(
                    target: "rewind.history",
                    direction = direction.as_str(),
                    editor = editor.raw(),
                    error = %error,
                    "history step aborted"
                );
                via.report_error(&error);
                Err(error)
            }
        }
    }

    /// Switch context to the entry's editor, capture its live state as the
    /// pending opposite entry, then restore. Returns the pending entry.
    fn restore_entry(
        &self,
        direction: Direction,
        entry: &HistoryEntry<S>,
        via: &dyn HistoryHost<Snapshot = S>,
    ) -> Result<HistoryEntry<S>, HistoryError> {
        let editor = entry.editor();
        let resolved;
        let target: &dyn HistoryHost<Snapshot = S> = if via.editor_id() == editor {
            via
        } else {
            resolved = self
                .state()
                .editor(editor)
                .ok_or(HistoryError::EditorUnavailable(editor))?;
            &*resolved
        };

        let previous_active = via.active_editor();
        if previous_active != editor {
            debug!(
                target: "rewind.history",
                from = previous_active.raw(),
                to = editor.raw(),
                "switching active editor"
            );
            via.set_active_editor(editor);
        }

        let (snapshot, selection) = target.current_state();
        let pending = HistoryEntry::new(editor, snapshot, selection);

        let _span = debug_span!(
            "history.restore",
            direction = direction.as_str(),
            editor = editor.raw(),
        )
        .entered();

        match target.restore(entry.snapshot(), entry.selection(), &TagSet::skip_history()) {
            Ok(()) => Ok(pending),
            Err(source) => {
                if previous_active != editor {
                    via.set_active_editor(previous_active);
                }
                Err(HistoryError::Restore { editor, source })
            }
        }
    }
}
