#![forbid(unsafe_code)]

//! Attaching editors to a shared history.
//!
//! [`attach`] subscribes a change listener and the three history command
//! handlers on one editor. The returned [`Attachment`] removes exactly those
//! registrations again; the stacks themselves are never touched by detach,
//! so other editors sharing the state keep their history.
//!
//! Attaching an editor that is already attached to the same state registers
//! nothing new and hands back a second handle to the existing registration.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::commands::register_handlers;
use crate::dirty::DocumentSnapshot;
use crate::host::{CommandBus, DocumentEngine, EditorId, HistoryHost, HostRef, ListenerId};
use crate::state::{HistoryState, SharedHistory};
use crate::transition::Transition;

/// Everything one `attach` call registered on one editor.
pub(crate) struct Registration<S: DocumentSnapshot> {
    editor: EditorId,
    host: HostRef<S>,
    listener: ListenerId,
    commands: Vec<ListenerId>,
    detached: Cell<bool>,
}

impl<S: DocumentSnapshot> Registration<S> {
    pub(crate) fn is_detached(&self) -> bool {
        self.detached.get()
    }

    pub(crate) fn host(&self) -> Option<Rc<dyn HistoryHost<Snapshot = S>>> {
        self.host.upgrade()
    }

    /// Remove every registration once. Returns false if already torn down.
    fn teardown(&self) -> bool {
        if self.detached.replace(true) {
            return false;
        }
        if let Some(host) = self.host.upgrade() {
            host.unsubscribe(self.listener);
            for id in &self.commands {
                host.unregister_command(*id);
            }
        }
        true
    }
}

/// Teardown handle returned by [`attach`].
///
/// Dropping the handle does not detach; call [`detach`](Self::detach).
#[must_use = "keep the attachment to be able to detach the editor later"]
pub struct Attachment<S: DocumentSnapshot> {
    registration: Rc<Registration<S>>,
    history: Weak<std::cell::RefCell<HistoryState<S>>>,
}

impl<S: DocumentSnapshot> fmt::Debug for Attachment<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("editor", &self.registration.editor)
            .field("detached", &self.registration.is_detached())
            .finish()
    }
}

impl<S: DocumentSnapshot> Attachment<S> {
    /// Editor this attachment belongs to.
    #[must_use]
    pub fn editor(&self) -> EditorId {
        self.registration.editor
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.registration.is_detached()
    }

    /// Unsubscribe everything the attachment registered. Idempotent.
    pub fn detach(&self) {
        if !self.registration.teardown() {
            return;
        }
        if let Some(state) = self.history.upgrade() {
            let mut state = state.borrow_mut();
            let owned = state
                .attachments
                .get(&self.registration.editor)
                .is_some_and(|current| Rc::ptr_eq(current, &self.registration));
            if owned {
                state.attachments.remove(&self.registration.editor);
            }
        }
        debug!(
            target: "rewind.history",
            editor = self.registration.editor.raw(),
            "editor detached from history"
        );
    }
}

/// Register history listeners and command handlers for `editor` against
/// `history`.
///
/// `merge_window` is this editor's coalescing window. Commands are
/// registered at [`CommandPriority::Critical`](crate::CommandPriority).
pub fn attach<E>(
    editor: &Rc<E>,
    history: &SharedHistory<E::Snapshot>,
    merge_window: Duration,
) -> Attachment<E::Snapshot>
where
    E: HistoryHost + 'static,
{
    let editor_id = editor.editor_id();
    let weak_state = Rc::downgrade(&history.state);

    let existing = history
        .state()
        .attachments
        .get(&editor_id)
        .filter(|reg| !reg.is_detached())
        .cloned();
    if let Some(registration) = existing {
        debug!(
            target: "rewind.history",
            editor = editor_id.raw(),
            "editor already attached; reusing registration"
        );
        return Attachment {
            registration,
            history: weak_state,
        };
    }

    let host: Rc<dyn HistoryHost<Snapshot = E::Snapshot>> = editor.clone();
    let weak_host = Rc::downgrade(&host);

    let listener = {
        let history = history.clone();
        host.subscribe(Box::new(move |transition: &Transition<E::Snapshot>| {
            history.apply_transition(editor_id, merge_window, transition);
        }))
    };
    let commands = register_handlers(&*host, &weak_host, history);

    let registration = Rc::new(Registration {
        editor: editor_id,
        host: weak_host.clone(),
        listener,
        commands,
        detached: Cell::new(false),
    });

    {
        let mut state = history.state_mut();
        state.register_editor(editor_id, weak_host);
        state.attachments.insert(editor_id, Rc::clone(&registration));
    }

    debug!(
        target: "rewind.history",
        editor = editor_id.raw(),
        merge_window_ms = merge_window.as_millis() as u64,
        "editor attached to history"
    );

    Attachment {
        registration,
        history: weak_state,
    }
}
