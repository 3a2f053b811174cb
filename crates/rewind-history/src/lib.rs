#![forbid(unsafe_code)]

//! Rewind History
//!
//! Undo/redo reconciliation for structured-document editors. The engine sits
//! beside a host document engine, watches committed transitions, and keeps
//! two bounded stacks of restore points that can be replayed through the
//! host on request.
//!
//! # Key Components
//!
//! - [`classify`] - Dirty evaluator: material edit, selection-only, or nothing
//! - [`SharedHistory`] - Reference-shared [`HistoryState`], one per undo scope
//! - [`attach`] - Wire an editor's commit stream and commands to a history
//! - [`HistoryHost`] - What an editor must provide ([`DocumentEngine`] + [`CommandBus`])
//! - [`HistoryConfig`] - Merge window and depth cap
//!
//! # How it fits together
//!
//! ```text
//!  editor commit ──► change listener ──► dirty evaluator
//!                          │                   │
//!                          ▼                   ▼
//!                    stack manager ◄──── push / coalesce
//!                          │
//!        UNDO / REDO ──────┤──► host.restore(snapshot, selection, skip-history)
//!        CLEAR_HISTORY ────┘──► CanUndo / CanRedo signals
//! ```
//!
//! Several editors (for example a main editor and editors nested inside its
//! content) may attach to the same [`SharedHistory`]; undo then walks their
//! interleaved edits in commit order and switches the active editor as
//! needed.
//!
//! # Example
//!
//! ```ignore
//! let history = rewind_history::create_empty_history_state();
//! let attachment = rewind_history::attach(&editor, &history, config.merge_window());
//! // ... edits ...
//! editor.dispatch_command(HistoryCommand::Undo);
//! attachment.detach();
//! ```

mod attach;
pub mod clock;
pub mod commands;
pub mod config;
pub mod dirty;
pub mod error;
pub mod host;
mod listener;
pub mod selection;
mod stack;
pub mod state;
pub mod transition;

pub use attach::{Attachment, attach};
pub use clock::{HistoryClock, MonotonicClock};
pub use commands::{CommandPriority, HISTORY_COMMAND_PRIORITY, HistoryCommand, HistorySignal};
pub use config::{DEFAULT_MAX_DEPTH, DEFAULT_MERGE_WINDOW_MS, HistoryConfig, HistoryConfigError};
pub use dirty::{ChangeKind, DocumentSnapshot, classify};
pub use error::{HistoryError, RestoreError};
pub use host::{
    CommandBus, CommandHandler, CommitListener, DocumentEngine, EditorId, HistoryHost, ListenerId,
};
pub use selection::{NodeKey, PointUnit, Selection, SelectionPoint};
pub use state::{CommitOutcome, HistoryEntry, HistoryState, SharedHistory, create_empty_history_state};
pub use transition::{FORCE_MERGE_TAG, FORCE_NEW_ENTRY_TAG, SKIP_HISTORY_TAG, TagSet, Transition};
