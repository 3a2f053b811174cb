#![forbid(unsafe_code)]

//! Command handlers and outbound availability signals.
//!
//! Every attachment registers three inbound commands at
//! [`CommandPriority::Critical`] so history settles before other consumers
//! see the command. After each stack mutation the engine emits
//! [`HistorySignal::CanUndo`] and [`HistorySignal::CanRedo`] to every attached
//! editor, even when the value did not change.

use std::rc::Weak;

use tracing::debug;

use crate::dirty::DocumentSnapshot;
use crate::host::{CommandBus, DocumentEngine, HistoryHost, ListenerId};
use crate::state::SharedHistory;

/// Inbound history commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryCommand {
    Undo,
    Redo,
    ClearHistory,
}

impl HistoryCommand {
    pub const ALL: [Self; 3] = [Self::Undo, Self::Redo, Self::ClearHistory];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undo => "UNDO",
            Self::Redo => "REDO",
            Self::ClearHistory => "CLEAR_HISTORY",
        }
    }
}

/// Outbound availability signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistorySignal {
    CanUndo(bool),
    CanRedo(bool),
}

/// Handler priority; higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CommandPriority {
    Editor,
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Priority every history handler registers at.
pub const HISTORY_COMMAND_PRIORITY: CommandPriority = CommandPriority::Critical;

impl<S: DocumentSnapshot> SharedHistory<S> {
    /// Emit the current availability booleans to every attached editor.
    pub(crate) fn emit_signals(&self) {
        // Collect first so no borrow is held while consumers run.
        let (can_undo, can_redo, hosts) = {
            let state = self.state();
            (state.can_undo(), state.can_redo(), state.attached_hosts())
        };
        for host in hosts {
            host.dispatch_signal(HistorySignal::CanUndo(can_undo));
            host.dispatch_signal(HistorySignal::CanRedo(can_redo));
        }
    }
}

/// Register UNDO, REDO and CLEAR_HISTORY on `host`, bound to `history`.
pub(crate) fn register_handlers<S: DocumentSnapshot>(
    host: &dyn HistoryHost<Snapshot = S>,
    weak_host: &Weak<dyn HistoryHost<Snapshot = S>>,
    history: &SharedHistory<S>,
) -> Vec<ListenerId> {
    HistoryCommand::ALL
        .into_iter()
        .map(|command| {
            let history = history.clone();
            let weak_host = weak_host.clone();
            let handler = move || {
                let Some(host) = weak_host.upgrade() else {
                    return false;
                };
                debug!(
                    target: "rewind.history",
                    command = command.as_str(),
                    editor = host.editor_id().raw(),
                    "history command received"
                );
                match command {
                    // Failures are already reported to the host by undo/redo.
                    HistoryCommand::Undo => {
                        let _ = history.undo(&*host);
                    }
                    HistoryCommand::Redo => {
                        let _ = history.redo(&*host);
                    }
                    HistoryCommand::ClearHistory => history.clear(),
                }
                true
            };
            host.register_command(command, HISTORY_COMMAND_PRIORITY, Box::new(handler))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_outranks_everything() {
        assert!(CommandPriority::Critical > CommandPriority::High);
        assert!(CommandPriority::High > CommandPriority::Normal);
        assert!(CommandPriority::Low > CommandPriority::Editor);
        assert_eq!(HISTORY_COMMAND_PRIORITY, CommandPriority::Critical);
    }

    #[test]
    fn command_names() {
        let names: Vec<_> = HistoryCommand::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["UNDO", "REDO", "CLEAR_HISTORY"]);
    }
}
