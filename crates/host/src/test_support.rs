//! Shared mocks for the host test suites.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::bail;
use async_trait::async_trait;
use docket_primitives::{EditId, EditorKind, ResourceId};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::delegate::{CreatedDocument, DocumentDelegate};
use crate::storage::Storage;
use crate::text_model::{TextDocument, TextDocumentResolver};

/// One observed delegate call, with the arguments the tests assert on.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
	Create {
		resource: ResourceId,
		kind: EditorKind,
		backup_id: Option<String>,
	},
	DisposeDocument {
		resource: ResourceId,
	},
	Save,
	SaveAs {
		target: ResourceId,
	},
	Revert,
	Undo {
		edit: EditId,
		dirty: bool,
	},
	Redo {
		edit: EditId,
		dirty: bool,
	},
	DisposeEdits {
		edits: Vec<EditId>,
	},
}

/// Scriptable delegate recording every outbound call.
///
/// Saves and creations can be switched into blocking mode, where each call
/// parks on a oneshot until the test completes it; that is how the suites
/// interleave concurrent saves and concurrent creations deterministically.
#[derive(Default)]
pub struct MockDelegate {
	editable: AtomicBool,
	block_saves: AtomicBool,
	fail_saves: AtomicBool,
	block_creates: AtomicBool,
	calls: Mutex<Vec<Call>>,
	save_waiters: Mutex<Vec<oneshot::Sender<anyhow::Result<()>>>>,
	create_waiters: Mutex<Vec<oneshot::Sender<CreatedDocument>>>,
}

impl MockDelegate {
	pub fn new() -> Arc<Self> {
		let _ = tracing_subscriber::fmt::try_init();
		let delegate = Self::default();
		delegate.editable.store(true, Ordering::SeqCst);
		Arc::new(delegate)
	}

	pub fn read_only() -> Arc<Self> {
		let _ = tracing_subscriber::fmt::try_init();
		Arc::new(Self::default())
	}

	pub fn set_block_saves(&self, block: bool) {
		self.block_saves.store(block, Ordering::SeqCst);
	}

	pub fn set_fail_saves(&self, fail: bool) {
		self.fail_saves.store(fail, Ordering::SeqCst);
	}

	pub fn set_block_creates(&self, block: bool) {
		self.block_creates.store(block, Ordering::SeqCst);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
		self.calls.lock().iter().filter(|c| matches(c)).count()
	}

	/// Number of saves currently parked in blocking mode.
	pub fn parked_saves(&self) -> usize {
		self.save_waiters.lock().len()
	}

	/// Completes the oldest parked save with the given outcome.
	pub fn finish_save(&self, outcome: anyhow::Result<()>) {
		let waiter = self.save_waiters.lock().remove(0);
		let _ = waiter.send(outcome);
	}

	/// Completes the oldest parked creation.
	pub fn finish_create(&self, editable: bool) {
		let waiter = self.create_waiters.lock().remove(0);
		let _ = waiter.send(CreatedDocument { editable });
	}

	fn record(&self, call: Call) {
		self.calls.lock().push(call);
	}
}

#[async_trait]
impl DocumentDelegate for MockDelegate {
	async fn create_document(
		&self,
		resource: &ResourceId,
		kind: &EditorKind,
		backup_id: Option<&str>,
		_cancel: CancellationToken,
	) -> anyhow::Result<CreatedDocument> {
		self.record(Call::Create {
			resource: resource.clone(),
			kind: kind.clone(),
			backup_id: backup_id.map(str::to_owned),
		});
		if self.block_creates.load(Ordering::SeqCst) {
			let (tx, rx) = oneshot::channel();
			self.create_waiters.lock().push(tx);
			return Ok(rx.await?);
		}
		Ok(CreatedDocument {
			editable: self.editable.load(Ordering::SeqCst),
		})
	}

	async fn dispose_document(
		&self,
		resource: &ResourceId,
		_kind: &EditorKind,
	) -> anyhow::Result<()> {
		self.record(Call::DisposeDocument {
			resource: resource.clone(),
		});
		Ok(())
	}

	async fn save(
		&self,
		_resource: &ResourceId,
		_kind: &EditorKind,
		_cancel: CancellationToken,
	) -> anyhow::Result<()> {
		self.record(Call::Save);
		if self.fail_saves.load(Ordering::SeqCst) {
			bail!("save rejected");
		}
		if self.block_saves.load(Ordering::SeqCst) {
			let (tx, rx) = oneshot::channel();
			self.save_waiters.lock().push(tx);
			return rx.await?;
		}
		Ok(())
	}

	async fn save_as(
		&self,
		_resource: &ResourceId,
		_kind: &EditorKind,
		target: &ResourceId,
		_cancel: CancellationToken,
	) -> anyhow::Result<()> {
		self.record(Call::SaveAs {
			target: target.clone(),
		});
		Ok(())
	}

	async fn revert(
		&self,
		_resource: &ResourceId,
		_kind: &EditorKind,
		_cancel: CancellationToken,
	) -> anyhow::Result<()> {
		self.record(Call::Revert);
		Ok(())
	}

	async fn undo(
		&self,
		_resource: &ResourceId,
		_kind: &EditorKind,
		edit: EditId,
		dirty: bool,
	) -> anyhow::Result<()> {
		self.record(Call::Undo { edit, dirty });
		Ok(())
	}

	async fn redo(
		&self,
		_resource: &ResourceId,
		_kind: &EditorKind,
		edit: EditId,
		dirty: bool,
	) -> anyhow::Result<()> {
		self.record(Call::Redo { edit, dirty });
		Ok(())
	}

	async fn dispose_edits(
		&self,
		_resource: &ResourceId,
		_kind: &EditorKind,
		edits: Vec<EditId>,
	) -> anyhow::Result<()> {
		self.record(Call::DisposeEdits { edits });
		Ok(())
	}
}

/// Storage that records copies without touching a filesystem.
#[derive(Default)]
pub struct MemStorage {
	copies: Mutex<Vec<(ResourceId, ResourceId)>>,
}

impl MemStorage {
	pub fn copies(&self) -> Vec<(ResourceId, ResourceId)> {
		self.copies.lock().clone()
	}
}

#[async_trait]
impl Storage for MemStorage {
	async fn copy(&self, source: &ResourceId, target: &ResourceId) -> std::io::Result<()> {
		self.copies.lock().push((source.clone(), target.clone()));
		Ok(())
	}
}

/// Rich-text backend stub with a switchable dirty flag.
pub struct StubTextDocument {
	readonly: bool,
	dirty_tx: watch::Sender<bool>,
	saves: AtomicUsize,
	reverts: AtomicUsize,
}

impl StubTextDocument {
	pub fn new(readonly: bool) -> Self {
		Self {
			readonly,
			dirty_tx: watch::channel(false).0,
			saves: AtomicUsize::new(0),
			reverts: AtomicUsize::new(0),
		}
	}

	pub fn set_dirty(&self, dirty: bool) {
		self.dirty_tx.send_if_modified(|current| {
			if *current == dirty {
				return false;
			}
			*current = dirty;
			true
		});
	}

	pub fn saves(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}

	pub fn reverts(&self) -> usize {
		self.reverts.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl TextDocument for StubTextDocument {
	fn dirty(&self) -> bool {
		*self.dirty_tx.borrow()
	}

	fn readonly(&self) -> bool {
		self.readonly
	}

	fn subscribe_dirty(&self) -> watch::Receiver<bool> {
		self.dirty_tx.subscribe()
	}

	async fn save(&self) -> anyhow::Result<()> {
		self.saves.fetch_add(1, Ordering::SeqCst);
		self.set_dirty(false);
		Ok(())
	}

	async fn revert(&self) -> anyhow::Result<()> {
		self.reverts.fetch_add(1, Ordering::SeqCst);
		self.set_dirty(false);
		Ok(())
	}
}

/// Resolver handing out one shared stub backend.
pub struct StubResolver {
	document: Arc<StubTextDocument>,
	resolves: AtomicUsize,
}

impl StubResolver {
	pub fn new(document: Arc<StubTextDocument>) -> Self {
		Self {
			document,
			resolves: AtomicUsize::new(0),
		}
	}

	pub fn resolves(&self) -> usize {
		self.resolves.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl TextDocumentResolver for StubResolver {
	async fn resolve(&self, _resource: &ResourceId) -> anyhow::Result<Arc<dyn TextDocument>> {
		self.resolves.fetch_add(1, Ordering::SeqCst);
		Ok(self.document.clone())
	}
}
