#![forbid(unsafe_code)]

//! Change listener: turns committed transitions into stack operations.
//!
//! Precedence, highest first:
//!
//! 1. `skip-history`: ignored entirely.
//! 2. `force-new-entry`: always pushed, classification and timing bypassed.
//! 3. `force-merge`: folded into the top entry, pushed if there is none.
//! 4. Otherwise the dirty evaluator decides (see [`classify`]).

use std::time::Duration;

use tracing::{debug, trace};

use crate::dirty::{ChangeKind, DocumentSnapshot, classify};
use crate::host::EditorId;
use crate::state::{CommitOutcome, HistoryEntry, RecordMode, SharedHistory};
use crate::transition::Transition;

impl<S: DocumentSnapshot> SharedHistory<S> {
    /// Feed one committed transition from `editor` into the history.
    ///
    /// Attached editors call this from their commit listener; hosts driving
    /// history by hand can call it directly.
    pub fn apply_transition(
        &self,
        editor: EditorId,
        merge_window: Duration,
        transition: &Transition<S>,
    ) -> CommitOutcome {
        let tags = &transition.tags;
        if tags.skips_history() {
            trace!(target: "rewind.history", editor = editor.raw(), "transition skipped");
            return CommitOutcome::Skipped;
        }

        let mode = if tags.forces_new_entry() {
            RecordMode::ForceNew
        } else if tags.forces_merge() {
            RecordMode::ForceMerge
        } else {
            let kind = classify(transition);
            trace!(
                target: "rewind.history",
                editor = editor.raw(),
                kind = kind.as_str(),
                dirty_leaves = transition.dirty_leaves.len(),
                dirty_elements = transition.dirty_elements.len(),
                "transition classified"
            );
            match kind {
                ChangeKind::None => return CommitOutcome::Ignored,
                ChangeKind::SelectionOnly => {
                    return self
                        .state_mut()
                        .refresh_selection(editor, transition.selection_after.clone());
                }
                ChangeKind::Material => RecordMode::Timed,
            }
        };

        let entry = HistoryEntry::new(
            editor,
            transition.previous.clone(),
            transition.selection_before.clone(),
        )
        .with_trailing_selection(transition.selection_after.clone());

        let (outcome, undo_depth) = {
            let mut state = self.state_mut();
            let now = state.now();
            let outcome = state.record_material(entry, now, merge_window, mode);
            (outcome, state.undo_depth())
        };
        debug!(
            target: "rewind.history",
            editor = editor.raw(),
            outcome = ?outcome,
            tags = %tags,
            undo_depth,
            "transition recorded"
        );
        self.emit_signals();
        outcome
    }
}
