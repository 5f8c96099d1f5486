//! Keyed, reference-counted pool of live document models.
//!
//! The registry is the sole arbiter of uniqueness: at most one model
//! exists per [`DocumentKey`], including while creation is still in
//! flight. A slot is inserted atomically with the occupancy check and
//! carries a `Creating` placeholder; concurrent requesters subscribe to
//! the same slot and await the one creation instead of racing.
//!
//! Reference counts are explicit. Releasing the last reference disposes
//! the model immediately when it is clean; a dirty model is kept alive by
//! a one-shot deferred disposal that waits for the model to report clean
//! and re-checks the count before finalizing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use docket_primitives::{DocumentKey, EditorKind};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::model::DocumentModel;
use crate::{Error, Result};

/// Lifecycle of one registry slot.
#[derive(Clone)]
enum SlotState {
	/// Creation is in flight; subscribers wait.
	Creating,
	/// The model is live.
	Ready(DocumentModel),
	/// Creation failed; the slot is about to disappear.
	Failed,
}

struct Slot {
	/// Outstanding [`ModelRef`] count. At least 1 while retained.
	refs: usize,
	tx: watch::Sender<SlotState>,
}

/// A counted reference to a registered model.
///
/// Each value stands for exactly one unit of the slot's reference count;
/// hand it back with [`ModelRegistry::release`]. Dropping it without a
/// release leaks the count on purpose: lifecycle here is explicit, not
/// scope-driven.
#[must_use = "a ModelRef holds a reference count; release it through the registry"]
pub struct ModelRef {
	key: DocumentKey,
	rx: watch::Receiver<SlotState>,
}

impl ModelRef {
	/// The referenced document's identity.
	pub fn key(&self) -> &DocumentKey {
		&self.key
	}

	/// Resolves the model, waiting out an in-flight creation.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] when creation failed or the slot was
	/// force-disposed before resolving.
	pub async fn model(&self) -> Result<DocumentModel> {
		let mut rx = self.rx.clone();
		match rx.wait_for(|s| !matches!(s, SlotState::Creating)).await {
			Ok(state) => match &*state {
				SlotState::Ready(model) => Ok(model.clone()),
				_ => Err(Error::NotFound(self.key.clone())),
			},
			Err(_) => Err(Error::NotFound(self.key.clone())),
		}
	}
}

/// Registry of live document models, one per key.
#[derive(Default)]
pub struct ModelRegistry {
	slots: Mutex<HashMap<DocumentKey, Slot>>,
}

impl ModelRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Retains an existing entry, bumping its count.
	///
	/// Returns `None` on a miss, with no side effects. A hit during an
	/// in-flight creation joins that creation.
	pub fn try_retain(&self, key: &DocumentKey) -> Option<ModelRef> {
		let mut slots = self.slots.lock();
		let slot = slots.get_mut(key)?;
		slot.refs += 1;
		trace!(key = %key, refs = slot.refs, "model retained");
		Some(ModelRef {
			key: key.clone(),
			rx: slot.tx.subscribe(),
		})
	}

	/// Creates and registers the model for `key`, returning the first
	/// reference.
	///
	/// The slot is claimed before `create` runs, so a concurrent `add`
	/// (or [`try_retain`]) for the same key joins the in-flight creation
	/// instead of creating a second instance. On creation failure the
	/// slot is removed and the error propagates; concurrent waiters
	/// observe [`Error::NotFound`].
	///
	/// [`try_retain`]: Self::try_retain
	pub async fn add<F>(self: &Arc<Self>, key: DocumentKey, create: F) -> Result<ModelRef>
	where
		F: Future<Output = Result<DocumentModel>>,
	{
		let (model_ref, owner) = {
			let mut slots = self.slots.lock();
			match slots.get_mut(&key) {
				Some(slot) => {
					slot.refs += 1;
					(
						ModelRef {
							key: key.clone(),
							rx: slot.tx.subscribe(),
						},
						false,
					)
				}
				None => {
					let (tx, rx) = watch::channel(SlotState::Creating);
					slots.insert(key.clone(), Slot { refs: 1, tx });
					(
						ModelRef {
							key: key.clone(),
							rx,
						},
						true,
					)
				}
			}
		};

		if !owner {
			// Someone else claimed the slot first; await their creation.
			model_ref.model().await?;
			return Ok(model_ref);
		}

		match create.await {
			Ok(model) => {
				let registered = {
					let slots = self.slots.lock();
					slots
						.get(&key)
						.map(|slot| slot.tx.send(SlotState::Ready(model.clone())).is_ok())
						.unwrap_or(false)
				};
				if !registered {
					// The slot was force-disposed while we were creating.
					warn!(key = %key, "slot disappeared during creation");
					dispose_logged(&model).await;
					return Err(Error::NotFound(key));
				}
				debug!(key = %key, "model registered");
				Ok(model_ref)
			}
			Err(error) => {
				let mut slots = self.slots.lock();
				if let Some(slot) = slots.remove(&key) {
					let _ = slot.tx.send(SlotState::Failed);
				}
				Err(error)
			}
		}
	}

	/// Looks up the model without touching the reference count.
	///
	/// Used for calls arriving from the external process keyed by
	/// document identity rather than by a held reference.
	pub async fn get(&self, key: &DocumentKey) -> Result<DocumentModel> {
		let rx = {
			let slots = self.slots.lock();
			slots.get(key).map(|slot| slot.tx.subscribe())
		};
		let Some(mut rx) = rx else {
			return Err(Error::NotFound(key.clone()));
		};
		match rx.wait_for(|s| !matches!(s, SlotState::Creating)).await {
			Ok(state) => match &*state {
				SlotState::Ready(model) => Ok(model.clone()),
				_ => Err(Error::NotFound(key.clone())),
			},
			Err(_) => Err(Error::NotFound(key.clone())),
		}
	}

	/// Hands back one reference.
	///
	/// At zero: a clean model is disposed and its entry removed; a dirty
	/// model stays registered until its first clean transition, then
	/// disposal finalizes (unless a retain resurrected it meanwhile).
	///
	/// A reference outliving its entry is a no-op to hand back, even when
	/// the key has since been reoccupied: refs are matched to the slot
	/// they came from, never to the key alone.
	pub async fn release(self: &Arc<Self>, model_ref: ModelRef) {
		enum Action {
			Keep,
			Dispose(DocumentModel),
			Defer(DocumentModel),
		}

		let ModelRef { key, rx } = model_ref;
		let action = {
			let mut slots = self.slots.lock();
			let Some(slot) = slots.get_mut(&key) else {
				// Already force-disposed; nothing left to hand back.
				return;
			};
			if !rx.same_channel(&slot.tx.subscribe()) {
				// The ref belongs to a replaced entry for this key; the
				// count here is not its to touch.
				trace!(key = %key, "stale reference released");
				return;
			}
			slot.refs = slot.refs.saturating_sub(1);
			trace!(key = %key, refs = slot.refs, "model released");
			if slot.refs > 0 {
				Action::Keep
			} else {
				let state = slot.tx.borrow().clone();
				match state {
					SlotState::Ready(model) => {
						if model.dirty() {
							Action::Defer(model)
						} else {
							slots.remove(&key);
							Action::Dispose(model)
						}
					}
					_ => {
						slots.remove(&key);
						Action::Keep
					}
				}
			}
		};

		match action {
			Action::Keep => {}
			Action::Dispose(model) => dispose_logged(&model).await,
			Action::Defer(model) => {
				debug!(key = %key, "dirty at zero refs; deferring disposal");
				let registry = self.clone();
				tokio::spawn(async move {
					let mut rx = model.subscribe_dirty();
					if rx.wait_for(|dirty| !dirty).await.is_ok() {
						registry.finalize_deferred(&key).await;
					}
				});
			}
		}
	}

	/// Forcibly disposes every entry of the given editor kind.
	///
	/// Ignores dirty state and outstanding references; entries of other
	/// kinds are untouched. Used when the owning provider is
	/// deregistered.
	pub async fn dispose_all_for_kind(&self, kind: &EditorKind) {
		let victims: Vec<(DocumentKey, SlotState)> = {
			let mut slots = self.slots.lock();
			let keys: Vec<DocumentKey> =
				slots.keys().filter(|k| &k.kind == kind).cloned().collect();
			keys.into_iter()
				.filter_map(|key| {
					slots
						.remove(&key)
						.map(|slot| (key, slot.tx.borrow().clone()))
				})
				.collect()
		};

		for (key, state) in victims {
			debug!(key = %key, "force-disposing model");
			if let SlotState::Ready(model) = state {
				dispose_logged(&model).await;
			}
		}
	}

	/// Number of registered entries (live or in creation).
	pub fn len(&self) -> usize {
		self.slots.lock().len()
	}

	/// Returns `true` when no entries are registered.
	pub fn is_empty(&self) -> bool {
		self.slots.lock().is_empty()
	}

	/// Finishes a deferred disposal, unless the entry was resurrected or
	/// already removed.
	async fn finalize_deferred(self: &Arc<Self>, key: &DocumentKey) {
		let model = {
			let mut slots = self.slots.lock();
			match slots.get(key) {
				Some(slot) if slot.refs == 0 => {
					let state = slot.tx.borrow().clone();
					slots.remove(key);
					match state {
						SlotState::Ready(model) => Some(model),
						_ => None,
					}
				}
				_ => None,
			}
		};
		if let Some(model) = model {
			debug!(key = %key, "deferred disposal finalized");
			dispose_logged(&model).await;
		}
	}
}

/// Disposes a model, logging instead of propagating: disposal runs on
/// registry-internal paths with no caller to surface the error to.
async fn dispose_logged(model: &DocumentModel) {
	if let Err(error) = model.dispose().await {
		warn!(key = %model.key(), %error, "dispose failed");
	}
}

#[cfg(test)]
mod tests;
