#![forbid(unsafe_code)]

//! Reference fixtures for `rewind-history`.
//!
//! - [`TestEditor`] - in-memory document engine and command bus
//! - [`EditorContext`] - active-editor pointer shared by nested editors
//! - [`DocSnapshot`] - tree snapshot with blake3 checksums for round-trip checks
//! - [`ManualClock`] - deterministic merge-window timing

pub mod clock;
pub mod document;
pub mod editor;

pub use clock::ManualClock;
pub use document::{DocSnapshot, DocState, NodeKind, TestNode};
pub use editor::{Draft, EditorContext, TestEditor};
