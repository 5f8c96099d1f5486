//! Outbound contract to the external process that owns document content.
//!
//! The host never interprets content; every state-changing operation is
//! mirrored to the delegate over an already-established asynchronous
//! channel. Cancellation tokens are cooperative and local: a token lets the
//! transport stop waiting, but the host suppresses stale results with
//! generation checks instead of relying on remote abort.

use async_trait::async_trait;
use docket_primitives::{EditId, EditorKind, ResourceId};
use tokio_util::sync::CancellationToken;

/// Result of negotiating a new document with the external process.
#[derive(Debug, Clone, Copy)]
pub struct CreatedDocument {
	/// Whether the document accepts edits. Immutable for the document's
	/// lifetime.
	pub editable: bool,
}

/// Calls from the host into the external process.
///
/// All methods are failable; errors propagate to the operation's caller
/// unchanged and never mutate host state.
#[async_trait]
pub trait DocumentDelegate: Send + Sync {
	/// Negotiates a new document, yielding its editability.
	async fn create_document(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		backup_id: Option<&str>,
		cancel: CancellationToken,
	) -> anyhow::Result<CreatedDocument>;

	/// Releases the document handle on the external side.
	async fn dispose_document(&self, resource: &ResourceId, kind: &EditorKind)
	-> anyhow::Result<()>;

	/// Persists the document.
	async fn save(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		cancel: CancellationToken,
	) -> anyhow::Result<()>;

	/// Persists the document at a new location.
	async fn save_as(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		target: &ResourceId,
		cancel: CancellationToken,
	) -> anyhow::Result<()>;

	/// Discards unpersisted changes on the external side.
	async fn revert(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		cancel: CancellationToken,
	) -> anyhow::Result<()>;

	/// Announces that an edit was undone, with the resulting dirty flag.
	async fn undo(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		edit: EditId,
		dirty: bool,
	) -> anyhow::Result<()>;

	/// Announces that an edit was reapplied, with the resulting dirty flag.
	async fn redo(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		edit: EditId,
		dirty: bool,
	) -> anyhow::Result<()>;

	/// Releases edit handles cut from the log (branch cuts and reverts).
	async fn dispose_edits(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		edits: Vec<EditId>,
	) -> anyhow::Result<()>;
}
