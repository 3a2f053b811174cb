#![forbid(unsafe_code)]

//! Errors surfaced by undo/redo.

use std::fmt;

use crate::host::EditorId;
use crate::selection::NodeKey;

/// Why a host refused to restore a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    /// The snapshot or selection references a node that no longer exists.
    NodeMissing(NodeKey),
    /// The host rejected the restore for another reason.
    Rejected(String),
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeMissing(key) => write!(f, "node {key} no longer exists"),
            Self::Rejected(msg) => write!(f, "restore rejected: {msg}"),
        }
    }
}

impl std::error::Error for RestoreError {}

/// Failure of a single undo or redo. The history stacks are left exactly as
/// they were before the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The owning editor could not restore the entry.
    Restore {
        editor: EditorId,
        source: RestoreError,
    },
    /// The entry belongs to an editor that has been dropped.
    EditorUnavailable(EditorId),
}

impl HistoryError {
    /// Editor the failed entry belongs to.
    #[must_use]
    pub fn editor(&self) -> EditorId {
        match self {
            Self::Restore { editor, .. } | Self::EditorUnavailable(editor) => *editor,
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restore { editor, source } => {
                write!(f, "restore into editor {} failed: {source}", editor.raw())
            }
            Self::EditorUnavailable(editor) => {
                write!(f, "editor {} is no longer available", editor.raw())
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Restore { source, .. } => Some(source),
            Self::EditorUnavailable(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_mentions_editor_and_cause() {
        let err = HistoryError::Restore {
            editor: EditorId::new(7),
            source: RestoreError::NodeMissing(NodeKey::from("t3")),
        };
        let msg = err.to_string();
        assert!(msg.contains("editor 7"), "{msg}");
        assert!(msg.contains("t3"), "{msg}");
        assert!(err.source().is_some());
        assert_eq!(err.editor(), EditorId::new(7));
    }

    #[test]
    fn unavailable_has_no_source() {
        let err = HistoryError::EditorUnavailable(EditorId::new(2));
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "editor 2 is no longer available");
    }
}
