#![forbid(unsafe_code)]

//! Minimal structured document used as the snapshot type in tests.
//!
//! A document is a tree of element nodes (root, paragraph, quote) with text
//! leaves. Every node carries a `revision` counter that is bumped whenever
//! the node is made writable; it is incidental metadata and never takes part
//! in content comparison or export.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use rewind_history::{DocumentSnapshot, NodeKey};
use serde_json::{Value, json};

/// Node variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Paragraph,
    Quote,
    Text {
        text: String,
        classes: BTreeSet<String>,
    },
}

impl NodeKind {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            classes: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Paragraph => "paragraph",
            Self::Quote => "quote",
            Self::Text { .. } => "text",
        }
    }
}

/// One node plus its tree links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNode {
    pub kind: NodeKind,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    pub revision: u64,
}

impl TestNode {
    fn new(kind: NodeKind, parent: Option<NodeKey>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            revision: 0,
        }
    }
}

/// Mutable document tree. Frozen into a [`DocSnapshot`] on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocState {
    root: NodeKey,
    nodes: BTreeMap<NodeKey, TestNode>,
}

impl DocState {
    /// Document holding only a root element.
    #[must_use]
    pub fn new(root: impl Into<NodeKey>) -> Self {
        let root = root.into();
        let mut nodes = BTreeMap::new();
        nodes.insert(root.clone(), TestNode::new(NodeKind::Root, None));
        Self { root, nodes }
    }

    #[must_use]
    pub fn root(&self) -> &NodeKey {
        &self.root
    }

    #[must_use]
    pub fn get(&self, key: &NodeKey) -> Option<&TestNode> {
        self.nodes.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.keys()
    }

    /// Text of leaf `key`, if it is a text node.
    #[must_use]
    pub fn text(&self, key: &NodeKey) -> Option<&str> {
        match &self.nodes.get(key)?.kind {
            NodeKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn children(&self, key: &NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[], |node| node.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, key: &NodeKey) -> Option<&NodeKey> {
        self.nodes.get(key)?.parent.as_ref()
    }

    /// Text leaves in document order.
    #[must_use]
    pub fn text_keys(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_text(&self.root, &mut out);
        out
    }

    /// Text of every leaf in document order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.text_keys()
            .iter()
            .filter_map(|key| self.text(key).map(str::to_owned))
            .collect()
    }

    fn collect_text(&self, key: &NodeKey, out: &mut Vec<NodeKey>) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        if node.kind.is_element() {
            for child in &node.children {
                self.collect_text(child, out);
            }
        } else {
            out.push(key.clone());
        }
    }

    pub(crate) fn get_mut(&mut self, key: &NodeKey) -> Option<&mut TestNode> {
        self.nodes.get_mut(key)
    }

    /// Insert `key` under `parent` at `index` (appends when `None` or out of
    /// range). Returns false if the parent is missing or not an element.
    pub(crate) fn insert(
        &mut self,
        parent: &NodeKey,
        index: Option<usize>,
        key: NodeKey,
        kind: NodeKind,
    ) -> bool {
        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return false;
        };
        if !parent_node.kind.is_element() {
            return false;
        }
        let at = index
            .filter(|i| *i <= parent_node.children.len())
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(at, key.clone());
        self.nodes
            .insert(key, TestNode::new(kind, Some(parent.clone())));
        true
    }

    /// Detach `key` from its parent and drop it with all descendants.
    /// Returns the removed keys; empty for the root or a missing key.
    pub(crate) fn remove_subtree(&mut self, key: &NodeKey) -> Vec<NodeKey> {
        if *key == self.root || !self.nodes.contains_key(key) {
            return Vec::new();
        }
        if let Some(parent) = self.parent(key).cloned()
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|child| child != key);
        }
        let mut removed = Vec::new();
        let mut pending = vec![key.clone()];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
                removed.push(next);
            }
        }
        removed
    }

    fn export(&self, key: &NodeKey) -> Value {
        let Some(node) = self.nodes.get(key) else {
            return Value::Null;
        };
        match &node.kind {
            NodeKind::Text { text, classes } => json!({
                "type": node.kind.type_name(),
                "text": text,
                "classes": classes.iter().collect::<Vec<_>>(),
            }),
            kind => json!({
                "type": kind.type_name(),
                "children": node.children.iter().map(|child| self.export(child)).collect::<Vec<_>>(),
            }),
        }
    }
}

/// Immutable, cheaply clonable committed document state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSnapshot(Rc<DocState>);

impl DocSnapshot {
    #[must_use]
    pub fn new(state: DocState) -> Self {
        Self(Rc::new(state))
    }

    #[must_use]
    pub fn state(&self) -> &DocState {
        &self.0
    }

    /// Exported document tree. Keys and revisions are left out, so two
    /// documents with the same visible content serialize identically.
    #[must_use]
    pub fn serialize(&self) -> Value {
        self.0.export(self.0.root())
    }

    /// `blake3:<hex>` digest of [`serialize`](Self::serialize).
    #[must_use]
    pub fn checksum(&self) -> String {
        let exported = self.serialize().to_string();
        format!("blake3:{}", blake3::hash(exported.as_bytes()).to_hex())
    }
}

impl DocumentSnapshot for DocSnapshot {
    fn contains(&self, key: &NodeKey) -> bool {
        self.0.contains(key)
    }

    fn child_keys(&self, key: &NodeKey) -> Option<Vec<NodeKey>> {
        let node = self.0.get(key)?;
        node.kind.is_element().then(|| node.children.clone())
    }

    fn same_content(&self, other: &Self, key: &NodeKey) -> bool {
        match (self.0.get(key), other.0.get(key)) {
            (Some(a), Some(b)) => a.kind == b.kind,
            (None, None) => true,
            _ => false,
        }
    }
}
