//! Host-wide undo/redo bridge.
//!
//! Every edit a model records pushes one callback pair here; the host's
//! generic undo/redo commands drive the pairs back. Elements are grouped
//! per document key so one document's history never disturbs another's.
//!
//! Callbacks capture models weakly: once a document is disposed its
//! remaining elements are inert even before [`UndoRedoBridge::remove`]
//! runs.

use std::collections::HashMap;
use std::sync::Arc;

use docket_primitives::DocumentKey;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::trace;

/// Boxed async callback invoked for one undo or redo step.
pub type UndoRedoCallback = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// One undoable element: a matched pair of callbacks.
pub struct UndoRedoElement {
	/// Reverses the associated edit.
	pub undo: UndoRedoCallback,
	/// Reapplies the associated edit.
	pub redo: UndoRedoCallback,
}

#[derive(Default)]
struct KeyStack {
	past: Vec<Arc<UndoRedoElement>>,
	future: Vec<Arc<UndoRedoElement>>,
}

/// Per-key stacks of undoable elements.
#[derive(Default)]
pub struct UndoRedoBridge {
	stacks: Mutex<HashMap<DocumentKey, KeyStack>>,
}

impl UndoRedoBridge {
	/// Creates an empty bridge.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records an element at the top of the key's stack.
	///
	/// A new element makes previously undone elements unreachable, so the
	/// key's redo pile is cleared.
	pub fn push(&self, key: DocumentKey, element: UndoRedoElement) {
		let mut stacks = self.stacks.lock();
		let stack = stacks.entry(key.clone()).or_default();
		stack.past.push(Arc::new(element));
		if !stack.future.is_empty() {
			trace!(key = %key, cleared = stack.future.len(), "redo pile cleared");
			stack.future.clear();
		}
	}

	/// Invokes the most recently pushed undo callback for the key.
	///
	/// Returns `false` when the key has nothing to undo.
	pub async fn undo(&self, key: &DocumentKey) -> bool {
		let element = {
			let mut stacks = self.stacks.lock();
			let Some(stack) = stacks.get_mut(key) else {
				return false;
			};
			let Some(element) = stack.past.pop() else {
				return false;
			};
			stack.future.push(element.clone());
			element
		};
		(element.undo)().await;
		true
	}

	/// Invokes the most recently undone element's redo callback for the key.
	///
	/// Returns `false` when the key has nothing to redo.
	pub async fn redo(&self, key: &DocumentKey) -> bool {
		let element = {
			let mut stacks = self.stacks.lock();
			let Some(stack) = stacks.get_mut(key) else {
				return false;
			};
			let Some(element) = stack.future.pop() else {
				return false;
			};
			stack.past.push(element.clone());
			element
		};
		(element.redo)().await;
		true
	}

	/// Drops every element recorded for the key.
	pub fn remove(&self, key: &DocumentKey) {
		if self.stacks.lock().remove(key).is_some() {
			trace!(key = %key, "undo elements removed");
		}
	}

	/// Number of elements available to undo for the key.
	pub fn undo_len(&self, key: &DocumentKey) -> usize {
		self.stacks.lock().get(key).map_or(0, |s| s.past.len())
	}

	/// Number of elements available to redo for the key.
	pub fn redo_len(&self, key: &DocumentKey) -> usize {
		self.stacks.lock().get(key).map_or(0, |s| s.future.len())
	}
}
