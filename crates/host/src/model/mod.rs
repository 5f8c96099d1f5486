//! Document models: the edit-log state machine and the closed variant set.
//!
//! A [`CustomModel`] owns the host-side view of one custom document: the
//! opaque edit log, the derived dirty flag, save serialization, and the
//! bridge into the host-wide undo stack. It never touches content; every
//! state change is mirrored to the [`DocumentDelegate`].
//!
//! # Save generations
//!
//! Concurrent saves resolve last-writer-wins. Each attempt mints a
//! generation from a monotonic clock; only the attempt whose generation is
//! still current when its delegate call settles may commit the save point.
//! A superseded save's completion is observed and discarded, success or
//! failure. Cancellation of the prior token is cooperative: it lets the
//! transport stop waiting but is not what guards state.

use std::sync::Arc;

use docket_primitives::{DocumentKey, EditId, EditLog, EditRecord, ResourceId};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::AutoSaveConfig;
use crate::delegate::DocumentDelegate;
use crate::storage::Storage;
use crate::text_model::TextModel;
use crate::undo::{UndoRedoBridge, UndoRedoElement};
use crate::{Error, Result};

/// Mutable model state, guarded by one mutex.
///
/// Guards are never held across an `.await`; delegate calls happen between
/// lock scopes and stale completions are filtered by generation.
struct ModelState {
	log: EditLog,
	/// Content changed outside the edit log (external file edits).
	content_changed: bool,
	/// Monotonic clock minting save generations. Guarded by the state
	/// lock so generations install in mint order.
	save_clock: u64,
	/// Generation and token of the in-flight save, if any.
	ongoing_save: Option<(u64, CancellationToken)>,
	/// Single pending autosave timer.
	pending_autosave: Option<AbortHandle>,
}

/// Host-side model of one custom document (edit-log variant).
pub struct CustomModel {
	key: DocumentKey,
	/// Fixed at creation by the external process. Read-only documents
	/// never mutate the edit log and never report dirty.
	editable: bool,
	delegate: Arc<dyn DocumentDelegate>,
	bridge: Arc<UndoRedoBridge>,
	storage: Arc<dyn Storage>,
	autosave: AutoSaveConfig,
	state: Mutex<ModelState>,
	dirty_tx: watch::Sender<bool>,
}

impl CustomModel {
	/// Negotiates a new document with the external process and builds its
	/// model.
	///
	/// Nothing is registered on failure; the error propagates to the
	/// caller.
	pub async fn create(
		key: DocumentKey,
		backup_id: Option<&str>,
		delegate: Arc<dyn DocumentDelegate>,
		bridge: Arc<UndoRedoBridge>,
		storage: Arc<dyn Storage>,
		autosave: AutoSaveConfig,
		cancel: CancellationToken,
	) -> Result<Arc<Self>> {
		let created = delegate
			.create_document(&key.resource, &key.kind, backup_id, cancel)
			.await?;
		debug!(key = %key, editable = created.editable, "custom document created");
		Ok(Arc::new(Self {
			key,
			editable: created.editable,
			delegate,
			bridge,
			storage,
			autosave,
			state: Mutex::new(ModelState {
				log: EditLog::new(),
				content_changed: false,
				save_clock: 0,
				ongoing_save: None,
				pending_autosave: None,
			}),
			dirty_tx: watch::channel(false).0,
		}))
	}

	/// The document's identity.
	pub fn key(&self) -> &DocumentKey {
		&self.key
	}

	/// Returns `true` when the document rejects edits.
	pub fn readonly(&self) -> bool {
		!self.editable
	}

	/// Derived dirty flag.
	///
	/// `dirty ⇔ content_changed || (log non-empty && save point ≠ current)`;
	/// read-only documents are never dirty.
	pub fn dirty(&self) -> bool {
		if !self.editable {
			return false;
		}
		let state = self.state.lock();
		state.content_changed || !state.log.at_save_point()
	}

	/// Subscribes to dirty transitions. The channel observes changes only.
	pub fn subscribe_dirty(&self) -> watch::Receiver<bool> {
		self.dirty_tx.subscribe()
	}

	/// Records one edit arriving from the external process.
	///
	/// Cuts the redo branch (reporting the cut ids for disposal exactly
	/// once), appends, and registers an undo/redo pair with the bridge.
	///
	/// # Errors
	///
	/// [`Error::NotEditable`] when the document is read-only.
	pub async fn push_edit(self: &Arc<Self>, id: EditId, label: Option<String>) -> Result<()> {
		if !self.editable {
			return Err(Error::NotEditable);
		}

		let removed = {
			let mut state = self.state.lock();
			let removed = state.log.push(EditRecord::new(id, label));
			trace!(key = %self.key, edit = %id, current = ?state.log.current_index(), "edit pushed");
			removed
		};
		self.publish_dirty();
		self.arm_autosave();

		self.bridge.push(self.key.clone(), self.undo_redo_element());

		if !removed.is_empty()
			&& let Err(error) = self
				.delegate
				.dispose_edits(&self.key.resource, &self.key.kind, removed)
				.await
		{
			warn!(key = %self.key, %error, "failed to release cut edits");
		}
		Ok(())
	}

	/// Marks the content changed outside the edit log.
	pub fn change_content(self: &Arc<Self>) {
		{
			let mut state = self.state.lock();
			state.content_changed = true;
		}
		self.publish_dirty();
		self.arm_autosave();
	}

	/// Steps the edit log back one edit and notifies the external process.
	///
	/// No-op when read-only or with nothing to undo.
	pub async fn undo(&self) -> Result<()> {
		if !self.editable {
			return Ok(());
		}
		let undone = {
			let mut state = self.state.lock();
			state.log.undo()
		};
		let Some(edit) = undone else {
			return Ok(());
		};
		self.publish_dirty();
		let dirty = self.dirty();
		trace!(key = %self.key, edit = %edit, dirty, "undo");
		self.delegate
			.undo(&self.key.resource, &self.key.kind, edit, dirty)
			.await?;
		Ok(())
	}

	/// Steps the edit log forward one edit and notifies the external
	/// process.
	///
	/// No-op when read-only or with nothing to redo.
	pub async fn redo(&self) -> Result<()> {
		if !self.editable {
			return Ok(());
		}
		let redone = {
			let mut state = self.state.lock();
			state.log.redo()
		};
		let Some(edit) = redone else {
			return Ok(());
		};
		self.publish_dirty();
		let dirty = self.dirty();
		trace!(key = %self.key, edit = %edit, dirty, "redo");
		self.delegate
			.redo(&self.key.resource, &self.key.kind, edit, dirty)
			.await?;
		Ok(())
	}

	/// Rewinds to the save point, discarding unpersisted edits.
	///
	/// No-op when read-only or already clean. The dead branch is reported
	/// for disposal; no redo survives.
	pub async fn revert(&self) -> Result<()> {
		if !self.editable {
			return Ok(());
		}
		{
			let state = self.state.lock();
			if state.log.current_index() == state.log.save_point_index() && !state.content_changed
			{
				return Ok(());
			}
		}

		self.delegate
			.revert(&self.key.resource, &self.key.kind, CancellationToken::new())
			.await?;

		let removed = {
			let mut state = self.state.lock();
			state.content_changed = false;
			state.log.revert_to_save_point()
		};
		self.publish_dirty();
		debug!(key = %self.key, dropped = removed.len(), "reverted to save point");

		if !removed.is_empty()
			&& let Err(error) = self
				.delegate
				.dispose_edits(&self.key.resource, &self.key.kind, removed)
				.await
		{
			warn!(key = %self.key, %error, "failed to release reverted edits");
		}
		Ok(())
	}

	/// Persists the document through the external process.
	///
	/// A new save immediately supersedes any in-flight one; the superseded
	/// completion is discarded without touching state. On failure the
	/// error propagates and nothing is mutated.
	pub async fn save(&self) -> Result<()> {
		if !self.editable {
			return Ok(());
		}

		let cancel = CancellationToken::new();
		// Minting and installing the generation happen under one guard, so
		// generations are installed in mint order even across racing
		// callers.
		let generation = {
			let mut state = self.state.lock();
			state.save_clock += 1;
			let generation = state.save_clock;
			if let Some((superseded, token)) =
				state.ongoing_save.replace((generation, cancel.clone()))
			{
				trace!(key = %self.key, superseded, generation, "save superseded");
				token.cancel();
			}
			generation
		};

		let outcome = self
			.delegate
			.save(&self.key.resource, &self.key.kind, cancel)
			.await;

		{
			let mut state = self.state.lock();
			let still_current = matches!(state.ongoing_save, Some((g, _)) if g == generation);
			if still_current {
				if outcome.is_ok() {
					state.content_changed = false;
					state.log.mark_saved();
				}
				// Runs on success and failure alike, but only for the
				// generation that is still current.
				state.ongoing_save = None;
			}
		}
		self.publish_dirty();
		outcome.map_err(Error::from)
	}

	/// Persists the document at a new location.
	///
	/// Editable documents round-trip through the external process and then
	/// treat every applied edit as persisted. Read-only documents degrade
	/// to a byte-level copy with no edit-log involvement.
	pub async fn save_as(&self, source: &ResourceId, target: &ResourceId) -> Result<()> {
		if !self.editable {
			self.storage.copy(source, target).await?;
			return Ok(());
		}

		self.delegate
			.save_as(
				&self.key.resource,
				&self.key.kind,
				target,
				CancellationToken::new(),
			)
			.await?;
		{
			let mut state = self.state.lock();
			state.log.mark_saved();
		}
		self.publish_dirty();
		debug!(key = %self.key, target = %target, "saved as");
		Ok(())
	}

	/// Releases the document: stops timers, drops undo elements, and
	/// notifies the external process.
	pub async fn dispose(&self) -> Result<()> {
		{
			let mut state = self.state.lock();
			if let Some(timer) = state.pending_autosave.take() {
				timer.abort();
			}
			if let Some((_, token)) = state.ongoing_save.take() {
				token.cancel();
			}
		}
		if self.editable {
			self.bridge.remove(&self.key);
		}
		self.delegate
			.dispose_document(&self.key.resource, &self.key.kind)
			.await?;
		debug!(key = %self.key, "custom document disposed");
		Ok(())
	}

	/// Builds the bridge element for the edit just pushed.
	///
	/// Callbacks hold the model weakly so the bridge never keeps a
	/// disposed document alive.
	fn undo_redo_element(self: &Arc<Self>) -> UndoRedoElement {
		let for_undo = Arc::downgrade(self);
		let for_redo = Arc::downgrade(self);
		UndoRedoElement {
			undo: Box::new(move || {
				let weak = for_undo.clone();
				async move {
					if let Some(model) = weak.upgrade()
						&& let Err(error) = model.undo().await
					{
						warn!(%error, "undo failed");
					}
				}
				.boxed()
			}),
			redo: Box::new(move || {
				let weak = for_redo.clone();
				async move {
					if let Some(model) = weak.upgrade()
						&& let Err(error) = model.redo().await
					{
						warn!(%error, "redo failed");
					}
				}
				.boxed()
			}),
		}
	}

	/// Publishes the derived dirty flag; receivers observe transitions
	/// only.
	fn publish_dirty(&self) {
		let dirty = self.dirty();
		self.dirty_tx.send_if_modified(|current| {
			if *current == dirty {
				return false;
			}
			*current = dirty;
			true
		});
	}

	/// (Re-)arms the single debounced autosave timer.
	///
	/// Arming aborts any previously pending timer, so at most one timer is
	/// pending per document. The timer holds the model weakly.
	fn arm_autosave(self: &Arc<Self>) {
		if !self.autosave.is_on() {
			return;
		}
		let weak = Arc::downgrade(self);
		let delay = self.autosave.delay();
		let handle = tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			if let Some(model) = weak.upgrade() {
				trace!(key = %model.key, "autosave firing");
				if let Err(error) = model.save().await {
					warn!(key = %model.key, %error, "autosave failed");
				}
			}
		})
		.abort_handle();

		let mut state = self.state.lock();
		if let Some(previous) = state.pending_autosave.replace(handle) {
			previous.abort();
		}
	}
}

/// The closed set of interchangeable model variants.
///
/// Selected once at creation time per editor kind; the registry treats
/// both identically.
#[derive(Clone)]
pub enum DocumentModel {
	/// Edit-log variant driven by the external process.
	Custom(Arc<CustomModel>),
	/// Variant delegating to a generic rich-text backend.
	Text(Arc<TextModel>),
}

impl DocumentModel {
	/// The document's identity.
	pub fn key(&self) -> &DocumentKey {
		match self {
			Self::Custom(m) => m.key(),
			Self::Text(m) => m.key(),
		}
	}

	/// Derived dirty flag.
	pub fn dirty(&self) -> bool {
		match self {
			Self::Custom(m) => m.dirty(),
			Self::Text(m) => m.dirty(),
		}
	}

	/// Returns `true` when the document rejects edits.
	pub fn readonly(&self) -> bool {
		match self {
			Self::Custom(m) => m.readonly(),
			Self::Text(m) => m.readonly(),
		}
	}

	/// Subscribes to dirty transitions.
	pub fn subscribe_dirty(&self) -> watch::Receiver<bool> {
		match self {
			Self::Custom(m) => m.subscribe_dirty(),
			Self::Text(m) => m.subscribe_dirty(),
		}
	}

	/// Persists the document.
	pub async fn save(&self) -> Result<()> {
		match self {
			Self::Custom(m) => m.save().await,
			Self::Text(m) => m.save().await,
		}
	}

	/// Persists the document at a new location.
	pub async fn save_as(&self, source: &ResourceId, target: &ResourceId) -> Result<()> {
		match self {
			Self::Custom(m) => m.save_as(source, target).await,
			Self::Text(m) => m.save_as(source, target).await,
		}
	}

	/// Discards unpersisted changes.
	pub async fn revert(&self) -> Result<()> {
		match self {
			Self::Custom(m) => m.revert().await,
			Self::Text(m) => m.revert().await,
		}
	}

	/// Releases the document.
	pub async fn dispose(&self) -> Result<()> {
		match self {
			Self::Custom(m) => m.dispose().await,
			Self::Text(m) => m.dispose().await,
		}
	}

	/// The edit-log variant, if that is what this model is.
	///
	/// Inbound edit traffic is only meaningful for custom models.
	pub fn as_custom(&self) -> Option<&Arc<CustomModel>> {
		match self {
			Self::Custom(m) => Some(m),
			Self::Text(_) => None,
		}
	}
}
