#![forbid(unsafe_code)]

//! Node keys and serializable selection descriptors.
//!
//! A [`Selection`] is recorded alongside every history entry so that undo and
//! redo can put the cursor back where it was. It only ever names nodes by
//! [`NodeKey`]; resolving those keys against a document is the host's job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node inside a document snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Create a key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a point offset counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointUnit {
    /// Offset counts characters inside a text leaf.
    Text,
    /// Offset counts children of an element.
    Element,
}

/// One end of a range selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub key: NodeKey,
    pub offset: usize,
    pub unit: PointUnit,
}

impl SelectionPoint {
    /// A point inside a text leaf.
    #[must_use]
    pub fn text(key: impl Into<NodeKey>, offset: usize) -> Self {
        Self {
            key: key.into(),
            offset,
            unit: PointUnit::Text,
        }
    }

    /// A point between the children of an element.
    #[must_use]
    pub fn element(key: impl Into<NodeKey>, offset: usize) -> Self {
        Self {
            key: key.into(),
            offset,
            unit: PointUnit::Element,
        }
    }
}

/// Cursor or selection state at the moment a transition was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Selection {
    /// Anchor/focus range. A collapsed range is a caret.
    Range {
        anchor: SelectionPoint,
        focus: SelectionPoint,
    },
    /// An ordered set of whole nodes (e.g. a selected image or block).
    Node { keys: Vec<NodeKey> },
}

impl Selection {
    /// Range selection between two points.
    #[must_use]
    pub fn range(anchor: SelectionPoint, focus: SelectionPoint) -> Self {
        Self::Range { anchor, focus }
    }

    /// Collapsed range at `point`.
    #[must_use]
    pub fn caret(point: SelectionPoint) -> Self {
        Self::Range {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// Node selection. Duplicate keys are dropped, first occurrence wins.
    #[must_use]
    pub fn nodes<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<NodeKey>,
    {
        let mut ordered: Vec<NodeKey> = Vec::new();
        for key in keys {
            let key = key.into();
            if !ordered.contains(&key) {
                ordered.push(key);
            }
        }
        Self::Node { keys: ordered }
    }

    #[must_use]
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node { .. })
    }

    /// True for a caret (range with anchor == focus). Node selections are
    /// never collapsed.
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        match self {
            Self::Range { anchor, focus } => anchor == focus,
            Self::Node { .. } => false,
        }
    }

    /// Every node key this selection refers to, in descriptor order.
    #[must_use]
    pub fn node_keys(&self) -> Vec<&NodeKey> {
        match self {
            Self::Range { anchor, focus } => {
                if anchor.key == focus.key {
                    vec![&anchor.key]
                } else {
                    vec![&anchor.key, &focus.key]
                }
            }
            Self::Node { keys } => keys.iter().collect(),
        }
    }
}
