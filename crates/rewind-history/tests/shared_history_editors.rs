#![forbid(unsafe_code)]

//! One history shared by a parent editor and an editor nested in its content.
//!
//! Validates:
//! - Interleaved edits undo in commit order across editors
//! - Undo switches the active editor before restoring a selection
//! - A node selection in one editor survives undo of another editor's edit
//! - Signals reach every attached editor
//! - Attach is idempotent per editor and detach only removes its own hooks
//! - Entries of a dropped editor fail cleanly

use std::rc::Rc;
use std::time::Duration;

use rewind_harness::{DocSnapshot, EditorContext, ManualClock, TestEditor};
use rewind_history::{
    DocumentEngine, FORCE_MERGE_TAG, HistoryCommand, HistoryConfig, HistoryError, HistorySignal,
    Selection, SharedHistory, TagSet, attach,
};

const WINDOW: Duration = Duration::from_millis(1000);

struct Pair {
    ctx: Rc<EditorContext>,
    parent: Rc<TestEditor>,
    nested: Rc<TestEditor>,
    history: SharedHistory<DocSnapshot>,
    clock: Rc<ManualClock>,
}

fn pair() -> Pair {
    let ctx = EditorContext::new();
    let parent = TestEditor::new(&ctx, "parent");
    let nested = TestEditor::new(&ctx, "nested");
    let clock = ManualClock::new();
    let history = SharedHistory::with_clock(&HistoryConfig::default(), clock.clone());
    Pair {
        ctx,
        parent,
        nested,
        history,
        clock,
    }
}

/// Put the caret at the end of the first leaf, then edit that leaf.
/// Returns the caret the edit started from.
fn caret_then_type(editor: &TestEditor, text: &str) -> Option<Selection> {
    editor.update(|draft| {
        let leaf = draft.text_nodes()[0].clone();
        draft.select_end(&leaf);
    });
    let caret = editor.selection();
    editor.update(|draft| {
        let leaf = draft.text_nodes()[0].clone();
        draft.insert_text(&leaf, text);
        draft.select_end(&leaf);
    });
    caret
}

#[test]
fn nested_then_parent_undo_walks_back_across_editors() {
    let p = pair();
    let _parent_hooks = attach(&p.parent, &p.history, WINDOW);
    let _nested_hooks = attach(&p.nested, &p.history, WINDOW);

    let nested_caret = caret_then_type(&p.nested, "inner");
    let parent_caret = caret_then_type(&p.parent, "outer");

    assert_eq!(p.history.undo_depth(), 2);
    assert_eq!(p.history.undo_editors(), vec![p.nested.id(), p.parent.id()]);
    assert_eq!(p.ctx.active(), Some(p.parent.id()));

    // First undo: parent's edit, selection scoped to the parent.
    p.parent.dispatch_command(HistoryCommand::Undo);
    assert_eq!(p.parent.texts(), vec![""]);
    assert_eq!(p.nested.texts(), vec!["inner"]);
    assert_eq!(p.parent.selection(), parent_caret);
    assert_eq!(p.ctx.active(), Some(p.parent.id()));

    // Second undo: nested edit; context moves to the nested editor first.
    p.parent.dispatch_command(HistoryCommand::Undo);
    assert_eq!(p.nested.texts(), vec![""]);
    assert_eq!(p.nested.selection(), nested_caret);
    assert_eq!(p.ctx.active(), Some(p.nested.id()));
    assert_eq!(
        p.ctx.switches().last(),
        Some(&(Some(p.parent.id()), p.nested.id()))
    );
    assert!(p.parent.errors().is_empty());
    assert_eq!(p.history.redo_editors(), vec![p.parent.id(), p.nested.id()]);
}

#[test]
fn node_selection_survives_nested_undo_and_is_restored() {
    let p = pair();
    let _parent_hooks = attach(&p.parent, &p.history, WINDOW);

    let node_selection = p.parent.update(|draft| {
        let leaf = draft.text_nodes()[0].clone();
        let paragraph = draft.parent(&leaf).expect("leaf has a paragraph");
        draft.set_text(&leaf, "parent");
        let selection = Selection::nodes([paragraph]);
        draft.set_selection(Some(selection.clone()));
        selection
    });
    p.clock.advance_ms(1500);
    p.parent.update(|draft| {
        let leaf = draft.text_nodes()[0].clone();
        draft.add_class(&leaf, "bold");
    });
    assert_eq!(p.parent.selection(), Some(node_selection.clone()));

    // Nested editor initialises its content before joining the history.
    p.nested.update_tagged(TagSet::new().with(FORCE_MERGE_TAG), |draft| {
        draft.append_paragraph("init");
    });
    let _nested_hooks = attach(&p.nested, &p.history, WINDOW);
    p.clock.advance_ms(1500);
    caret_then_type(&p.nested, "n");
    assert_eq!(p.history.undo_depth(), 3);

    p.parent.dispatch_command(HistoryCommand::Undo);
    assert_eq!(p.nested.texts(), vec!["", "init"]);
    let kept = p.parent.selection().expect("parent keeps its selection");
    assert!(kept.is_node());
    assert_eq!(kept, node_selection);

    p.parent.dispatch_command(HistoryCommand::Undo);
    assert_eq!(p.ctx.active(), Some(p.parent.id()));
    assert_eq!(p.parent.texts(), vec!["parent"]);
    assert_eq!(p.parent.selection(), Some(node_selection));
    assert!(p.parent.errors().is_empty());
    assert!(p.nested.errors().is_empty());
}

#[test]
fn redo_replays_in_reverse_across_editors() {
    let p = pair();
    let _a = attach(&p.parent, &p.history, WINDOW);
    let _b = attach(&p.nested, &p.history, WINDOW);
    caret_then_type(&p.nested, "n");
    caret_then_type(&p.parent, "p");

    p.parent.dispatch_command(HistoryCommand::Undo);
    p.parent.dispatch_command(HistoryCommand::Undo);
    p.nested.dispatch_command(HistoryCommand::Redo);
    assert_eq!(p.nested.texts(), vec!["n"]);
    assert_eq!(p.parent.texts(), vec![""]);

    p.nested.dispatch_command(HistoryCommand::Redo);
    assert_eq!(p.parent.texts(), vec!["p"]);
    assert_eq!(p.ctx.active(), Some(p.parent.id()));
    assert!(!p.history.can_redo());
}

#[test]
fn edits_from_different_editors_never_coalesce() {
    let p = pair();
    let _a = attach(&p.parent, &p.history, WINDOW);
    let _b = attach(&p.nested, &p.history, WINDOW);
    p.nested.update(|draft| {
        draft.append_paragraph("n");
    });
    p.clock.advance_ms(10);
    p.parent.update(|draft| {
        draft.append_paragraph("p");
    });
    assert_eq!(p.history.undo_depth(), 2);
}

#[test]
fn signals_reach_every_attached_editor() {
    let p = pair();
    let _a = attach(&p.parent, &p.history, WINDOW);
    let _b = attach(&p.nested, &p.history, WINDOW);
    p.nested.update(|draft| {
        draft.append_paragraph("n");
    });
    for editor in [&p.parent, &p.nested] {
        assert_eq!(
            editor.signals(),
            vec![HistorySignal::CanUndo(true), HistorySignal::CanRedo(false)]
        );
    }
}

#[test]
fn double_attach_registers_once() {
    let p = pair();
    let first = attach(&p.parent, &p.history, WINDOW);
    let second = attach(&p.parent, &p.history, WINDOW);
    assert_eq!(p.parent.listener_count(), 1);
    assert_eq!(p.parent.command_handler_count(), 3);

    p.parent.update(|draft| {
        draft.append_paragraph("once");
    });
    assert_eq!(p.history.undo_depth(), 1);
    assert_eq!(p.parent.signals().len(), 2);

    // Both handles share one registration.
    second.detach();
    assert!(first.is_detached());
    assert_eq!(p.parent.listener_count(), 0);
    first.detach();

    let third = attach(&p.parent, &p.history, WINDOW);
    assert!(!third.is_detached());
    assert_eq!(p.parent.listener_count(), 1);
    assert!(p.history.is_attached(p.parent.id()));
}

#[test]
fn detaching_one_editor_leaves_the_other_and_the_stacks() {
    let p = pair();
    let _parent_hooks = attach(&p.parent, &p.history, WINDOW);
    let nested_hooks = attach(&p.nested, &p.history, WINDOW);
    caret_then_type(&p.nested, "n");
    caret_then_type(&p.parent, "p");

    nested_hooks.detach();
    assert_eq!(p.history.undo_depth(), 2);
    assert!(!p.history.is_attached(p.nested.id()));
    assert!(p.history.is_attached(p.parent.id()));
    assert_eq!(p.parent.listener_count(), 1);

    p.nested.clear_signals();
    p.parent.dispatch_command(HistoryCommand::Undo);
    assert!(p.nested.signals().is_empty());

    // The detached editor is still alive, so its entry stays restorable.
    p.parent.dispatch_command(HistoryCommand::Undo);
    assert_eq!(p.nested.texts(), vec![""]);
    assert!(!p.history.can_undo());
}

#[test]
fn dropped_editor_entry_fails_without_touching_stacks() {
    let p = pair();
    let _parent_hooks = attach(&p.parent, &p.history, WINDOW);
    let nested_hooks = attach(&p.nested, &p.history, WINDOW);
    caret_then_type(&p.nested, "n");
    let nested_id = p.nested.id();

    let Pair {
        ctx,
        parent,
        nested,
        history,
        ..
    } = p;
    drop(nested);
    assert!(!history.is_attached(nested_id));

    let result = history.undo(&*parent);
    assert_eq!(result, Some(Err(HistoryError::EditorUnavailable(nested_id))));
    assert_eq!(history.undo_depth(), 1);
    assert_eq!(history.redo_depth(), 0);
    assert_eq!(parent.errors(), vec![HistoryError::EditorUnavailable(nested_id)]);
    assert_eq!(ctx.active(), Some(nested_id));

    // Tearing down after the editor is gone is harmless.
    nested_hooks.detach();
    assert!(nested_hooks.is_detached());
    assert_eq!(parent.editor_id(), parent.id());
}
