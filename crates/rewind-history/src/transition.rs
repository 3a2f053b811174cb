#![forbid(unsafe_code)]

//! Committed document transitions and the tags that steer history.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::selection::{NodeKey, Selection};

/// Transition is ignored by history entirely. Applied to every restore the
/// engine issues itself.
pub const SKIP_HISTORY_TAG: &str = "skip-history";

/// Transition always opens a new undo entry, regardless of classification or
/// merge window.
pub const FORCE_NEW_ENTRY_TAG: &str = "force-new-entry";

/// Transition always folds into the current top entry when one exists.
pub const FORCE_MERGE_TAG: &str = "force-merge";

/// Ordered set of string tags attached to a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The tag set the engine attaches to its own restore calls.
    #[must_use]
    pub fn skip_history() -> Self {
        Self::new().with(SKIP_HISTORY_TAG)
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, tag: impl Into<String>) -> Self {
        self.insert(tag);
        self
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn skips_history(&self) -> bool {
        self.contains(SKIP_HISTORY_TAG)
    }

    #[must_use]
    pub fn forces_new_entry(&self) -> bool {
        self.contains(FORCE_NEW_ENTRY_TAG)
    }

    #[must_use]
    pub fn forces_merge(&self) -> bool {
        self.contains(FORCE_MERGE_TAG)
    }
}

/// Comma-separated tags in order, `-` when empty.
impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (i, tag) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(tag)?;
        }
        Ok(())
    }
}

impl<T: Into<String>> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// One committed change from `previous` to `next`, as reported by the
/// document engine after its scheduler flushed a batch.
///
/// `dirty_elements` must include every element whose child list changed;
/// the dirty evaluator only inspects nodes named in the two dirty sets.
#[derive(Debug, Clone)]
pub struct Transition<S> {
    pub previous: S,
    pub next: S,
    pub dirty_leaves: HashSet<NodeKey>,
    pub dirty_elements: HashSet<NodeKey>,
    pub tags: TagSet,
    pub selection_before: Option<Selection>,
    pub selection_after: Option<Selection>,
}

impl<S> Transition<S> {
    /// A transition with empty dirty sets, no tags and no selection.
    #[must_use]
    pub fn new(previous: S, next: S) -> Self {
        Self {
            previous,
            next,
            dirty_leaves: HashSet::new(),
            dirty_elements: HashSet::new(),
            tags: TagSet::new(),
            selection_before: None,
            selection_after: None,
        }
    }

    #[must_use]
    pub fn with_dirty_leaves<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<NodeKey>,
    {
        self.dirty_leaves.extend(keys.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_dirty_elements<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<NodeKey>,
    {
        self.dirty_elements.extend(keys.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn with_selections(mut self, before: Option<Selection>, after: Option<Selection>) -> Self {
        self.selection_before = before;
        self.selection_after = after;
        self
    }

    /// True when neither dirty set names a node.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dirty_leaves.is_empty() && self.dirty_elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_predicates() {
        let tags: TagSet = [FORCE_MERGE_TAG, "paste"].into_iter().collect();
        assert!(tags.forces_merge());
        assert!(!tags.forces_new_entry());
        assert!(!tags.skips_history());
        assert!(tags.contains("paste"));
        assert!(TagSet::skip_history().skips_history());
    }

    #[test]
    fn tags_display_sorted() {
        let tags: TagSet = ["paste", FORCE_MERGE_TAG].into_iter().collect();
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["force-merge", "paste"]);
        assert_eq!(tags.to_string(), "force-merge,paste");
        assert!(TagSet::new().is_empty());
        assert_eq!(TagSet::new().to_string(), "-");
    }

    #[test]
    fn builder_collects_dirty_keys() {
        let t = Transition::new(1u8, 2u8)
            .with_dirty_leaves(["t1", "t2"])
            .with_dirty_elements(["root"]);
        assert_eq!(t.dirty_leaves.len(), 2);
        assert!(t.dirty_elements.contains(&NodeKey::from("root")));
        assert!(!t.is_clean());
        assert!(Transition::new(0u8, 0u8).is_clean());
    }
}
