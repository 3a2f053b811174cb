#![forbid(unsafe_code)]

//! Dirty evaluator: decides whether a transition is worth recording.
//!
//! Hosts mark nodes dirty whenever they are made writable, whether or not the
//! edit ends up changing anything. The evaluator compares only the dirty
//! nodes between the two snapshots and sorts the transition into one of
//! three buckets:
//!
//! | Kind            | Meaning                                              |
//! |-----------------|------------------------------------------------------|
//! | `Material`      | child list or exported content of a dirty node moved |
//! | `SelectionOnly` | content identical, selection moved                   |
//! | `None`          | nothing observable changed                           |
//!
//! Snapshots stay opaque: the evaluator only calls into
//! [`DocumentSnapshot`], so it never needs to know concrete node variants.

use crate::selection::NodeKey;
use crate::transition::Transition;

/// Read-only view of a document snapshot, enough to diff dirty nodes.
pub trait DocumentSnapshot: Clone + 'static {
    /// Whether `key` exists in this snapshot.
    fn contains(&self, key: &NodeKey) -> bool;

    /// Ordered children of element `key`. `None` when `key` is absent or is
    /// not an element.
    fn child_keys(&self, key: &NodeKey) -> Option<Vec<NodeKey>>;

    /// Whether the content-relevant exported fields of `key` match between
    /// `self` and `other`. Incidental metadata (revision counters, cached
    /// layout, ...) must not take part. A node present in only one of the two
    /// snapshots is never the same.
    fn same_content(&self, other: &Self, key: &NodeKey) -> bool;
}

/// Classification of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// No observable difference; never recorded.
    None,
    /// Only the selection moved.
    SelectionOnly,
    /// Content or structure changed.
    Material,
}

impl ChangeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SelectionOnly => "selection_only",
            Self::Material => "material",
        }
    }
}

/// Classify a transition by diffing its dirty nodes.
#[must_use]
pub fn classify<S: DocumentSnapshot>(transition: &Transition<S>) -> ChangeKind {
    let previous = &transition.previous;
    let next = &transition.next;

    for key in &transition.dirty_elements {
        if structure_changed(previous, next, key) || !previous.same_content(next, key) {
            return ChangeKind::Material;
        }
    }

    for key in &transition.dirty_leaves {
        if !previous.same_content(next, key) {
            return ChangeKind::Material;
        }
    }

    if transition.selection_before != transition.selection_after {
        ChangeKind::SelectionOnly
    } else {
        ChangeKind::None
    }
}

/// Child added, removed, or reordered under `key`, or `key` itself appeared
/// or vanished.
fn structure_changed<S: DocumentSnapshot>(previous: &S, next: &S, key: &NodeKey) -> bool {
    previous.contains(key) != next.contains(key) || previous.child_keys(key) != next.child_keys(key)
}
