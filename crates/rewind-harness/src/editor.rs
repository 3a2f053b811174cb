#![forbid(unsafe_code)]

//! In-memory editor: document engine plus command bus.
//!
//! [`TestEditor`] commits one transition per [`update`](TestEditor::update)
//! call and notifies subscribers synchronously, the way a host scheduler
//! flushes a batch. Several editors can share one [`EditorContext`], which
//! holds the active-editor pointer and hands out node keys, so a parent
//! editor and editors nested in its content behave like one host.
//!
//! Restores apply a selection only inside the active editor; restoring a
//! selection into an inactive editor is rejected, which lets tests prove the
//! history switched context first.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use rewind_history::{
    CommandBus, CommandHandler, CommandPriority, CommitListener, DocumentEngine, EditorId,
    HistoryCommand, HistoryError, HistorySignal, ListenerId, NodeKey, RestoreError, Selection,
    SelectionPoint, TagSet, Transition,
};
use serde_json::Value;
use tracing::trace;

use crate::document::{DocSnapshot, DocState, NodeKind};

// =============================================================================
// Shared host context
// =============================================================================

/// State shared by every editor of one host.
#[derive(Debug, Default)]
pub struct EditorContext {
    active: Cell<Option<EditorId>>,
    next_editor: Cell<u64>,
    next_key: Cell<u64>,
    switches: RefCell<Vec<(Option<EditorId>, EditorId)>>,
}

impl EditorContext {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Currently active editor, if any editor exists yet.
    #[must_use]
    pub fn active(&self) -> Option<EditorId> {
        self.active.get()
    }

    /// Every active-editor change so far, as `(from, to)`.
    #[must_use]
    pub fn switches(&self) -> Vec<(Option<EditorId>, EditorId)> {
        self.switches.borrow().clone()
    }

    fn activate(&self, editor: EditorId) {
        let from = self.active.replace(Some(editor));
        if from != Some(editor) {
            self.switches.borrow_mut().push((from, editor));
        }
    }

    fn allocate_editor(&self) -> EditorId {
        let id = self.next_editor.get() + 1;
        self.next_editor.set(id);
        EditorId::new(id)
    }

    fn allocate_key(&self, namespace: &str) -> NodeKey {
        let n = self.next_key.get() + 1;
        self.next_key.set(n);
        NodeKey::new(format!("{namespace}-{n}"))
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Working copy handed to [`TestEditor::update`]. Every mutation marks the
/// nodes it touches dirty, whether or not content ends up changing.
pub struct Draft<'a> {
    context: &'a EditorContext,
    namespace: &'a str,
    state: DocState,
    selection: Option<Selection>,
    dirty_leaves: HashSet<NodeKey>,
    dirty_elements: HashSet<NodeKey>,
}

impl<'a> Draft<'a> {
    fn new(
        context: &'a EditorContext,
        namespace: &'a str,
        state: DocState,
        selection: Option<Selection>,
    ) -> Self {
        Self {
            context,
            namespace,
            state,
            selection,
            dirty_leaves: HashSet::new(),
            dirty_elements: HashSet::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.state.root().clone()
    }

    #[must_use]
    pub fn state(&self) -> &DocState {
        &self.state
    }

    /// Text leaves in document order.
    #[must_use]
    pub fn text_nodes(&self) -> Vec<NodeKey> {
        self.state.text_keys()
    }

    #[must_use]
    pub fn parent(&self, key: &NodeKey) -> Option<NodeKey> {
        self.state.parent(key).cloned()
    }

    /// Append a paragraph holding `text` to the root. Returns the text leaf.
    pub fn append_paragraph(&mut self, text: &str) -> NodeKey {
        let root = self.root();
        let paragraph = self.context.allocate_key(self.namespace);
        let leaf = self.context.allocate_key(self.namespace);
        self.state
            .insert(&root, None, paragraph.clone(), NodeKind::Paragraph);
        self.state
            .insert(&paragraph, None, leaf.clone(), NodeKind::text(text));
        self.dirty_elements.insert(root);
        self.dirty_elements.insert(paragraph);
        self.dirty_leaves.insert(leaf.clone());
        leaf
    }

    /// Replace the text of leaf `key`.
    pub fn set_text(&mut self, key: &NodeKey, text: &str) {
        if let Some(node) = self.writable(key)
            && let NodeKind::Text { text: current, .. } = &mut node.kind
        {
            *current = text.to_owned();
        }
    }

    /// Append `text` to leaf `key`, like typing at its end.
    pub fn insert_text(&mut self, key: &NodeKey, text: &str) {
        if let Some(node) = self.writable(key)
            && let NodeKind::Text { text: current, .. } = &mut node.kind
        {
            current.push_str(text);
        }
    }

    /// Add a style class to leaf `key`.
    pub fn add_class(&mut self, key: &NodeKey, class: &str) {
        if let Some(node) = self.writable(key)
            && let NodeKind::Text { classes, .. } = &mut node.kind
        {
            classes.insert(class.to_owned());
        }
    }

    /// Mark `key` dirty without changing what it exports.
    pub fn mark_writable(&mut self, key: &NodeKey) {
        let _ = self.writable(key);
    }

    /// Swap element `key` for a quote holding the same children. Returns the
    /// quote's key, or `None` if `key` is not a non-root element.
    pub fn replace_with_quote(&mut self, key: &NodeKey) -> Option<NodeKey> {
        let parent = self.state.parent(key)?.clone();
        let node = self.state.get(key)?;
        if !node.kind.is_element() {
            return None;
        }
        let children = node.children.clone();
        let index = self.state.children(&parent).iter().position(|c| c == key);

        let quote = self.context.allocate_key(self.namespace);
        self.state.insert(&parent, index, quote.clone(), NodeKind::Quote);
        for child in &children {
            if let Some(child_node) = self.state.get_mut(child) {
                child_node.parent = Some(quote.clone());
            }
        }
        if let Some(quote_node) = self.state.get_mut(&quote) {
            quote_node.children = children;
        }
        if let Some(old) = self.state.get_mut(key) {
            old.children.clear();
        }
        self.state.remove_subtree(key);

        self.dirty_elements.insert(parent);
        self.dirty_elements.insert(key.clone());
        self.dirty_elements.insert(quote.clone());
        Some(quote)
    }

    /// Remove `key` and its descendants.
    pub fn remove(&mut self, key: &NodeKey) {
        let Some(node) = self.state.get(key) else {
            return;
        };
        let is_element = node.kind.is_element();
        if let Some(parent) = node.parent.clone() {
            self.dirty_elements.insert(parent);
        }
        if is_element {
            self.dirty_elements.insert(key.clone());
        } else {
            self.dirty_leaves.insert(key.clone());
        }
        self.state.remove_subtree(key);
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Collapse the selection to the end of leaf `key`.
    pub fn select_end(&mut self, key: &NodeKey) {
        let offset = self.state.text(key).map_or(0, |text| text.chars().count());
        self.selection = Some(Selection::caret(SelectionPoint::text(key.clone(), offset)));
    }

    fn writable(&mut self, key: &NodeKey) -> Option<&mut crate::document::TestNode> {
        let node = self.state.get_mut(key)?;
        node.revision += 1;
        if node.kind.is_element() {
            self.dirty_elements.insert(key.clone());
        } else {
            self.dirty_leaves.insert(key.clone());
        }
        Some(node)
    }
}

// =============================================================================
// Editor
// =============================================================================

struct CommandEntry {
    id: ListenerId,
    command: HistoryCommand,
    priority: CommandPriority,
    handler: Rc<dyn Fn() -> bool>,
}

type SharedListener = Rc<dyn Fn(&Transition<DocSnapshot>)>;

/// One editor instance.
pub struct TestEditor {
    id: EditorId,
    namespace: String,
    context: Rc<EditorContext>,
    document: RefCell<DocSnapshot>,
    selection: RefCell<Option<Selection>>,
    listeners: RefCell<Vec<(ListenerId, SharedListener)>>,
    commands: RefCell<Vec<CommandEntry>>,
    next_registration: Cell<ListenerId>,
    signals: RefCell<Vec<HistorySignal>>,
    errors: RefCell<Vec<HistoryError>>,
    failing_restores: Cell<usize>,
    commits: Cell<usize>,
}

impl std::fmt::Debug for TestEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEditor")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("texts", &self.texts())
            .field("commits", &self.commits.get())
            .finish()
    }
}

impl TestEditor {
    /// New editor whose document is a root with one empty paragraph. The
    /// first editor created in a context becomes the active one.
    #[must_use]
    pub fn new(context: &Rc<EditorContext>, namespace: &str) -> Rc<Self> {
        let id = context.allocate_editor();
        let mut state = DocState::new(format!("{namespace}-root"));
        let root = state.root().clone();
        let paragraph = context.allocate_key(namespace);
        let leaf = context.allocate_key(namespace);
        state.insert(&root, None, paragraph.clone(), NodeKind::Paragraph);
        state.insert(&paragraph, None, leaf, NodeKind::text(""));

        if context.active().is_none() {
            context.activate(id);
        }

        Rc::new(Self {
            id,
            namespace: namespace.to_owned(),
            context: Rc::clone(context),
            document: RefCell::new(DocSnapshot::new(state)),
            selection: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
            next_registration: Cell::new(0),
            signals: RefCell::new(Vec::new()),
            errors: RefCell::new(Vec::new()),
            failing_restores: Cell::new(0),
            commits: Cell::new(0),
        })
    }

    #[must_use]
    pub fn id(&self) -> EditorId {
        self.id
    }

    #[must_use]
    pub fn context(&self) -> &Rc<EditorContext> {
        &self.context
    }

    #[must_use]
    pub fn document(&self) -> DocSnapshot {
        self.document.borrow().clone()
    }

    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection.borrow().clone()
    }

    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.document.borrow().state().texts()
    }

    #[must_use]
    pub fn serialize(&self) -> Value {
        self.document.borrow().serialize()
    }

    /// Number of transitions committed, restores included.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.get()
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Run `f` against a draft and commit the result as one transition.
    /// Editing focuses this editor.
    pub fn update<R>(&self, f: impl FnOnce(&mut Draft<'_>) -> R) -> R {
        self.update_tagged(TagSet::new(), f)
    }

    /// Like [`update`](Self::update) with explicit transition tags.
    pub fn update_tagged<R>(&self, tags: TagSet, f: impl FnOnce(&mut Draft<'_>) -> R) -> R {
        self.context.activate(self.id);
        let previous = self.document();
        let selection_before = self.selection();
        let mut draft = Draft::new(
            &self.context,
            &self.namespace,
            previous.state().clone(),
            selection_before.clone(),
        );
        let result = f(&mut draft);

        let Draft {
            state,
            selection,
            dirty_leaves,
            dirty_elements,
            ..
        } = draft;
        let next = DocSnapshot::new(state);
        *self.document.borrow_mut() = next.clone();
        *self.selection.borrow_mut() = selection.clone();

        let transition = Transition {
            previous,
            next,
            dirty_leaves,
            dirty_elements,
            tags,
            selection_before,
            selection_after: selection,
        };
        self.commit(&transition);
        result
    }

    /// Make the next `n` restore calls fail.
    pub fn fail_next_restores(&self, n: usize) {
        self.failing_restores.set(n);
    }

    fn commit(&self, transition: &Transition<DocSnapshot>) {
        self.commits.set(self.commits.get() + 1);
        trace!(
            target: "rewind.harness",
            editor = self.id.raw(),
            dirty_leaves = transition.dirty_leaves.len(),
            dirty_elements = transition.dirty_elements.len(),
            "commit"
        );
        // Listeners may re-enter the editor; call them without a borrow held.
        let listeners: Vec<SharedListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(transition);
        }
    }

    // -------------------------------------------------------------------------
    // Command bus
    // -------------------------------------------------------------------------

    /// Run handlers for `command` from highest priority down, stopping at the
    /// first that reports it handled the command.
    pub fn dispatch_command(&self, command: HistoryCommand) -> bool {
        let mut handlers: Vec<(CommandPriority, ListenerId, Rc<dyn Fn() -> bool>)> = self
            .commands
            .borrow()
            .iter()
            .filter(|entry| entry.command == command)
            .map(|entry| (entry.priority, entry.id, Rc::clone(&entry.handler)))
            .collect();
        handlers.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        handlers.into_iter().any(|(_, _, handler)| handler())
    }

    /// Every signal received, oldest first.
    #[must_use]
    pub fn signals(&self) -> Vec<HistorySignal> {
        self.signals.borrow().clone()
    }

    /// Last `CanUndo` value received; false before any.
    #[must_use]
    pub fn can_undo_signal(&self) -> bool {
        self.signals
            .borrow()
            .iter()
            .rev()
            .find_map(|signal| match signal {
                HistorySignal::CanUndo(value) => Some(*value),
                HistorySignal::CanRedo(_) => None,
            })
            .unwrap_or(false)
    }

    /// Last `CanRedo` value received; false before any.
    #[must_use]
    pub fn can_redo_signal(&self) -> bool {
        self.signals
            .borrow()
            .iter()
            .rev()
            .find_map(|signal| match signal {
                HistorySignal::CanRedo(value) => Some(*value),
                HistorySignal::CanUndo(_) => None,
            })
            .unwrap_or(false)
    }

    pub fn clear_signals(&self) {
        self.signals.borrow_mut().clear();
    }

    /// Errors reported by history, oldest first.
    #[must_use]
    pub fn errors(&self) -> Vec<HistoryError> {
        self.errors.borrow().clone()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    #[must_use]
    pub fn command_handler_count(&self) -> usize {
        self.commands.borrow().len()
    }

    fn next_id(&self) -> ListenerId {
        let id = self.next_registration.get() + 1;
        self.next_registration.set(id);
        id
    }
}

impl DocumentEngine for TestEditor {
    type Snapshot = DocSnapshot;

    fn editor_id(&self) -> EditorId {
        self.id
    }

    fn subscribe(&self, listener: CommitListener<DocSnapshot>) -> ListenerId {
        let id = self.next_id();
        self.listeners.borrow_mut().push((id, Rc::from(listener)));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(existing, _)| *existing != id);
    }

    fn current_state(&self) -> (DocSnapshot, Option<Selection>) {
        (self.document(), self.selection())
    }

    fn restore(
        &self,
        snapshot: &DocSnapshot,
        selection: Option<&Selection>,
        tags: &TagSet,
    ) -> Result<(), RestoreError> {
        let pending_failures = self.failing_restores.get();
        if pending_failures > 0 {
            self.failing_restores.set(pending_failures - 1);
            return Err(RestoreError::Rejected("injected restore failure".into()));
        }
        if let Some(selection) = selection {
            if self.context.active() != Some(self.id) {
                return Err(RestoreError::Rejected(format!(
                    "editor {} is not active",
                    self.id.raw()
                )));
            }
            if let Some(missing) = selection
                .node_keys()
                .into_iter()
                .find(|key| !snapshot.state().contains(key))
            {
                return Err(RestoreError::NodeMissing(missing.clone()));
            }
        }

        let previous = self.document.replace(snapshot.clone());
        let selection_before = self.selection.replace(selection.cloned());

        let mut dirty_leaves = HashSet::new();
        let mut dirty_elements = HashSet::new();
        for state in [previous.state(), snapshot.state()] {
            for key in state.keys() {
                let is_element = state.get(key).is_some_and(|node| node.kind.is_element());
                if is_element {
                    dirty_elements.insert(key.clone());
                } else {
                    dirty_leaves.insert(key.clone());
                }
            }
        }

        let transition = Transition {
            previous,
            next: snapshot.clone(),
            dirty_leaves,
            dirty_elements,
            tags: tags.clone(),
            selection_before,
            selection_after: selection.cloned(),
        };
        self.commit(&transition);
        Ok(())
    }

    fn active_editor(&self) -> EditorId {
        self.context.active().unwrap_or(self.id)
    }

    fn set_active_editor(&self, editor: EditorId) {
        self.context.activate(editor);
    }

    fn report_error(&self, error: &HistoryError) {
        self.errors.borrow_mut().push(error.clone());
    }
}

impl CommandBus for TestEditor {
    fn register_command(
        &self,
        command: HistoryCommand,
        priority: CommandPriority,
        handler: CommandHandler,
    ) -> ListenerId {
        let id = self.next_id();
        self.commands.borrow_mut().push(CommandEntry {
            id,
            command,
            priority,
            handler: Rc::from(handler),
        });
        id
    }

    fn unregister_command(&self, id: ListenerId) {
        self.commands.borrow_mut().retain(|entry| entry.id != id);
    }

    fn dispatch_signal(&self, signal: HistorySignal) {
        self.signals.borrow_mut().push(signal);
    }
}
