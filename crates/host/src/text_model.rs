//! Text-backed document model.
//!
//! Some editor kinds reuse a generic rich-text backend instead of speaking
//! the custom edit protocol. This variant holds no edit log of its own;
//! dirty state, save, and revert all forward to the backend's model, and
//! "save as" flushes the backend before copying bytes to the target.

use std::sync::Arc;

use async_trait::async_trait;
use docket_primitives::{DocumentKey, ResourceId};
use tokio::sync::watch;
use tracing::debug;

use crate::Result;
use crate::storage::Storage;

/// External rich-text capability backing a [`TextModel`].
#[async_trait]
pub trait TextDocument: Send + Sync {
	/// Whether the backend reports unpersisted changes.
	fn dirty(&self) -> bool;
	/// Whether the backend rejects edits.
	fn readonly(&self) -> bool;
	/// Subscribes to the backend's dirty transitions.
	fn subscribe_dirty(&self) -> watch::Receiver<bool>;
	/// Flushes pending state to storage.
	async fn save(&self) -> anyhow::Result<()>;
	/// Discards pending state.
	async fn revert(&self) -> anyhow::Result<()>;
}

/// Resolves a rich-text backend for a resource at model-creation time.
#[async_trait]
pub trait TextDocumentResolver: Send + Sync {
	/// Obtains the backend document for the resource.
	async fn resolve(&self, resource: &ResourceId) -> anyhow::Result<Arc<dyn TextDocument>>;
}

/// Document model delegating to a rich-text backend.
///
/// Interchangeable with the edit-log variant from the registry's
/// perspective.
pub struct TextModel {
	key: DocumentKey,
	document: Arc<dyn TextDocument>,
	storage: Arc<dyn Storage>,
}

impl TextModel {
	/// Wraps a resolved backend document.
	pub fn new(key: DocumentKey, document: Arc<dyn TextDocument>, storage: Arc<dyn Storage>) -> Self {
		Self {
			key,
			document,
			storage,
		}
	}

	/// The document's identity.
	pub fn key(&self) -> &DocumentKey {
		&self.key
	}

	/// Forwards the backend's dirty flag.
	pub fn dirty(&self) -> bool {
		self.document.dirty()
	}

	/// Forwards the backend's read-only flag.
	pub fn readonly(&self) -> bool {
		self.document.readonly()
	}

	/// Subscribes to the backend's dirty transitions.
	pub fn subscribe_dirty(&self) -> watch::Receiver<bool> {
		self.document.subscribe_dirty()
	}

	/// Flushes the backend to storage.
	pub async fn save(&self) -> Result<()> {
		self.document.save().await?;
		Ok(())
	}

	/// Discards the backend's pending state.
	pub async fn revert(&self) -> Result<()> {
		self.document.revert().await?;
		Ok(())
	}

	/// Flushes the backend, then copies the resulting bytes to the target.
	pub async fn save_as(&self, source: &ResourceId, target: &ResourceId) -> Result<()> {
		self.document.save().await?;
		self.storage.copy(source, target).await?;
		debug!(key = %self.key, target = %target, "text-backed document saved as");
		Ok(())
	}

	/// Releases the backend reference. The backend outlives the model; no
	/// external notification is owed.
	pub async fn dispose(&self) -> Result<()> {
		debug!(key = %self.key, "text-backed document disposed");
		Ok(())
	}
}
