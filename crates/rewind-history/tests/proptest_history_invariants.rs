#![forbid(unsafe_code)]

//! Property tests for shared history invariants.
//!
//! Validates:
//! - Spaced material edits fill the undo stack up to the depth cap.
//! - Undo then redo restores the exact serialized document.
//! - Undoing everything then redoing everything lands on the final state.
//! - Random command sequences never exceed the depth cap, always leave the
//!   last emitted signals in agreement with the stacks, and clear always
//!   empties both stacks.

use std::rc::Rc;

use proptest::prelude::*;

use rewind_harness::{DocSnapshot, EditorContext, ManualClock, TestEditor};
use rewind_history::{Attachment, HistoryCommand, HistoryConfig, SharedHistory, attach};

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    /// Wait `gap_ms`, then append a paragraph.
    Append { gap_ms: u64, text: String },
    /// Wait `gap_ms`, then type into the first leaf.
    Type { gap_ms: u64, text: String },
    Undo,
    Redo,
    Clear,
}

fn text_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,4}"
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u64..3000, text_strategy()).prop_map(|(gap_ms, text)| Op::Append { gap_ms, text }),
        3 => (0u64..3000, text_strategy()).prop_map(|(gap_ms, text)| Op::Type { gap_ms, text }),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
        1 => Just(Op::Clear),
    ]
}

fn edits_strategy(max_len: usize) -> impl Strategy<Value = Vec<(u64, String)>> {
    prop::collection::vec((0u64..3000, text_strategy()), 1..=max_len)
}

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    editor: Rc<TestEditor>,
    history: SharedHistory<DocSnapshot>,
    clock: Rc<ManualClock>,
    _hooks: Attachment<DocSnapshot>,
}

fn fixture(config: HistoryConfig) -> Fixture {
    let ctx = EditorContext::new();
    let editor = TestEditor::new(&ctx, "prop");
    let clock = ManualClock::new();
    let history = SharedHistory::with_clock(&config, clock.clone());
    let hooks = attach(&editor, &history, config.merge_window());
    Fixture {
        editor,
        history,
        clock,
        _hooks: hooks,
    }
}

fn append(f: &Fixture, gap_ms: u64, text: &str) {
    f.clock.advance_ms(gap_ms);
    f.editor.update(|draft| {
        let leaf = draft.append_paragraph(text);
        draft.select_end(&leaf);
    });
}

fn type_text(f: &Fixture, gap_ms: u64, text: &str) {
    f.clock.advance_ms(gap_ms);
    f.editor.update(|draft| {
        let leaf = draft.text_nodes()[0].clone();
        draft.insert_text(&leaf, text);
        draft.select_end(&leaf);
    });
}

// ============================================================================
// Invariant 1: spaced edits fill to min(N, max_depth)
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn spaced_edits_fill_to_depth_cap(n in 1usize..40, max_depth in 1usize..16) {
        let f = fixture(HistoryConfig::default().with_max_depth(max_depth));
        for i in 0..n {
            append(&f, 1500, &format!("p{i}"));
        }
        prop_assert_eq!(f.history.undo_depth(), n.min(max_depth));
        prop_assert_eq!(f.history.redo_depth(), 0);
    }
}

// ============================================================================
// Invariant 2: undo then redo is the identity on the serialized document
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_then_redo_round_trips(edits in edits_strategy(20)) {
        let f = fixture(HistoryConfig::default());
        for (gap_ms, text) in &edits {
            append(&f, *gap_ms, text);
        }
        let before = f.editor.document().checksum();
        let before_tree = f.editor.serialize();

        prop_assert!(f.editor.dispatch_command(HistoryCommand::Undo));
        prop_assert_ne!(f.editor.document().checksum(), before.clone());
        prop_assert!(f.editor.dispatch_command(HistoryCommand::Redo));

        prop_assert_eq!(f.editor.document().checksum(), before);
        prop_assert_eq!(f.editor.serialize(), before_tree);
    }
}

// ============================================================================
// Invariant 3: undo all, redo all lands on the final state
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn full_rewind_and_replay(edits in edits_strategy(16)) {
        let f = fixture(HistoryConfig::default());
        let initial = f.editor.document().checksum();
        for (gap_ms, text) in &edits {
            type_text(&f, *gap_ms, text);
        }
        let last = f.editor.document().checksum();
        let depth = f.history.undo_depth();

        while f.history.can_undo() {
            prop_assert!(f.editor.dispatch_command(HistoryCommand::Undo));
        }
        prop_assert_eq!(f.editor.document().checksum(), initial);
        prop_assert_eq!(f.history.redo_depth(), depth);

        while f.history.can_redo() {
            prop_assert!(f.editor.dispatch_command(HistoryCommand::Redo));
        }
        prop_assert_eq!(f.editor.document().checksum(), last);
        prop_assert_eq!(f.history.undo_depth(), depth);
    }
}

// ============================================================================
// Invariant 4: random command sequences
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_sequences_hold_stack_laws(
        ops in prop::collection::vec(op_strategy(), 1..60),
        max_depth in 1usize..8,
    ) {
        let f = fixture(HistoryConfig::default().with_max_depth(max_depth));

        for op in &ops {
            let (undo_before, redo_before) = (f.history.undo_depth(), f.history.redo_depth());
            match op {
                Op::Append { gap_ms, text } => {
                    append(&f, *gap_ms, text);
                    prop_assert_eq!(f.history.redo_depth(), 0);
                    prop_assert!(f.history.can_undo());
                }
                Op::Type { gap_ms, text } => {
                    type_text(&f, *gap_ms, text);
                    prop_assert_eq!(f.history.redo_depth(), 0);
                    prop_assert!(f.history.can_undo());
                }
                Op::Undo => {
                    f.editor.dispatch_command(HistoryCommand::Undo);
                    if undo_before > 0 {
                        prop_assert_eq!(f.history.undo_depth(), undo_before - 1);
                        prop_assert_eq!(f.history.redo_depth(), redo_before + 1);
                    } else {
                        prop_assert_eq!(f.history.redo_depth(), redo_before);
                    }
                }
                Op::Redo => {
                    f.editor.dispatch_command(HistoryCommand::Redo);
                    if redo_before > 0 {
                        prop_assert_eq!(f.history.redo_depth(), redo_before - 1);
                        prop_assert_eq!(
                            f.history.undo_depth(),
                            (undo_before + 1).min(max_depth)
                        );
                    } else {
                        prop_assert_eq!(f.history.undo_depth(), undo_before);
                    }
                }
                Op::Clear => {
                    f.editor.dispatch_command(HistoryCommand::ClearHistory);
                    prop_assert!(!f.editor.can_undo_signal());
                    prop_assert!(!f.editor.can_redo_signal());
                }
            }

            prop_assert!(f.history.undo_depth() <= max_depth);
            if !f.editor.signals().is_empty() {
                prop_assert_eq!(f.editor.can_undo_signal(), f.history.can_undo());
                prop_assert_eq!(f.editor.can_redo_signal(), f.history.can_redo());
            }
        }
        prop_assert!(f.editor.errors().is_empty());
    }
}
