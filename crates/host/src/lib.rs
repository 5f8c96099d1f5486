//! Host-side lifecycle tracking for custom documents.
//!
//! A custom document is a logical editable resource whose content and edit
//! semantics live in a separate process. This crate tracks everything the
//! host is responsible for: identity, an opaque edit log, dirty state, and
//! the save/revert/undo/redo protocol.
//!
//! # Architecture
//!
//! ```text
//! DocumentHost                     ModelRegistry
//! ┌───────────────────┐            ┌──────────────────────────┐
//! │ provider table    │──open────► │ try_retain / add         │
//! │ inbound edits     │──get─────► │ refcounted slots per key │
//! └───────────────────┘            └───────────┬──────────────┘
//!                                              │ one live model per key
//!                                  ┌───────────▼──────────────┐
//!                                  │ DocumentModel            │
//!                                  │  Custom: edit log,       │
//!                                  │   save generations,      │
//!                                  │   autosave               │
//!                                  │  Text: delegating        │
//!                                  └───────────┬──────────────┘
//!              UndoRedoBridge ◄────────────────┤
//!              DocumentDelegate (external) ◄───┘
//! ```
//!
//! The registry is the sole arbiter of uniqueness; models serialize nothing
//! among themselves and suppress stale save results with a generation
//! counter rather than remote cancellation.

use docket_primitives::{DocumentKey, EditorKind};

pub mod config;
pub mod delegate;
pub mod host;
pub mod model;
pub mod registry;
pub mod storage;
pub mod text_model;
pub mod undo;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AutoSaveConfig, AutoSaveMode};
pub use delegate::{CreatedDocument, DocumentDelegate};
pub use host::{DocumentHost, ProviderSpec};
pub use model::{CustomModel, DocumentModel};
pub use registry::{ModelRef, ModelRegistry};
pub use storage::{FsStorage, Storage};
pub use text_model::{TextDocument, TextDocumentResolver, TextModel};
pub use undo::{UndoRedoBridge, UndoRedoElement};

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A mutating operation reached a read-only document.
	#[error("document is not editable")]
	NotEditable,
	/// No model is registered for the key.
	#[error("no model registered for {0}")]
	NotFound(DocumentKey),
	/// A provider was registered twice for the same editor kind.
	#[error("provider for {0} already registered")]
	DuplicateProvider(EditorKind),
	/// An editor kind was used without a registered provider.
	#[error("no provider for {0} registered")]
	UnknownProvider(EditorKind),
	/// The external process failed an asynchronous call.
	#[error("delegate call failed: {0}")]
	Delegate(#[from] anyhow::Error),
	/// The storage capability failed a byte-level copy.
	#[error("storage copy failed: {0}")]
	Storage(#[from] std::io::Error),
}
