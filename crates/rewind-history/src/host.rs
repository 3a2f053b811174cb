#![forbid(unsafe_code)]

//! Boundary between the history engine and its host.
//!
//! The engine consumes two collaborators it does not own:
//!
//! - [`DocumentEngine`]: commit notifications, snapshot restore, and the
//!   active-editor context.
//! - [`CommandBus`]: prioritised command handlers and outbound signals.
//!
//! Every editor instance attached to a history implements both, which the
//! blanket [`HistoryHost`] trait captures. All calls are synchronous and made
//! from the host's single update scheduler.

use std::rc::Weak;

use crate::commands::{CommandPriority, HistoryCommand, HistorySignal};
use crate::dirty::DocumentSnapshot;
use crate::error::{HistoryError, RestoreError};
use crate::selection::Selection;
use crate::transition::{TagSet, Transition};

/// Identity of one editor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub u64);

impl EditorId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Handle returned by registrations, used to remove them again.
pub type ListenerId = u64;

/// Callback invoked once per committed transition.
pub type CommitListener<S> = Box<dyn Fn(&Transition<S>)>;

/// Command handler. Returns `true` when the command was handled and should
/// not propagate to lower priorities.
pub type CommandHandler = Box<dyn Fn() -> bool>;

/// Document side of an editor instance.
pub trait DocumentEngine {
    /// Opaque full-document state.
    type Snapshot: DocumentSnapshot;

    /// Identity of this editor.
    fn editor_id(&self) -> EditorId;

    /// Register a listener called after every commit.
    fn subscribe(&self, listener: CommitListener<Self::Snapshot>) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);

    /// The committed snapshot and selection right now.
    fn current_state(&self) -> (Self::Snapshot, Option<Selection>);

    /// Atomically replace document state and selection, committing a
    /// transition tagged with `tags`.
    fn restore(
        &self,
        snapshot: &Self::Snapshot,
        selection: Option<&Selection>,
        tags: &TagSet,
    ) -> Result<(), RestoreError>;

    /// Editor currently considered active by the host.
    fn active_editor(&self) -> EditorId;

    /// Switch the active-editor context.
    fn set_active_editor(&self, editor: EditorId);

    /// Host error sink. Failed undo/redo attempts are reported here.
    fn report_error(&self, error: &HistoryError);
}

/// Command side of an editor instance.
pub trait CommandBus {
    /// Register `handler` for `command` at `priority`.
    fn register_command(
        &self,
        command: HistoryCommand,
        priority: CommandPriority,
        handler: CommandHandler,
    ) -> ListenerId;

    /// Remove a handler. Unknown ids are ignored.
    fn unregister_command(&self, id: ListenerId);

    /// Broadcast an outbound signal to the host's consumers.
    fn dispatch_signal(&self, signal: HistorySignal);
}

/// An editor the history engine can attach to.
pub trait HistoryHost: DocumentEngine + CommandBus {}

impl<T: DocumentEngine + CommandBus + ?Sized> HistoryHost for T {}

/// Weak handle to an attached editor, as stored in shared history state.
pub type HostRef<S> = Weak<dyn HistoryHost<Snapshot = S>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_id_round_trips_raw() {
        let id = EditorId::new(42);
        assert_eq!(id.raw(), 42);
        assert!(EditorId::new(1) < EditorId::new(2));
    }
}
