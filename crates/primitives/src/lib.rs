//! Shared primitives for the docket document host.
//!
//! Everything in this crate is pure data: no async, no I/O, no locking.
//! The host crate layers reference counting, delegation, and persistence
//! on top of these types.

pub mod edit_log;
pub mod key;

pub use edit_log::{EditLog, EditRecord};
pub use key::{DocumentKey, EditId, EditorKind, ResourceId, ViewState};
