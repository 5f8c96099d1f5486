//! Provider table and inbound surface.
//!
//! [`DocumentHost`] is what the shell and the external process talk to:
//! providers register an editor kind once, views open documents through
//! the registry, and inbound edit traffic is routed back to the owning
//! model by key.

use std::collections::HashMap;
use std::sync::Arc;

use docket_primitives::{DocumentKey, EditId, EditorKind, ResourceId};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::AutoSaveConfig;
use crate::delegate::DocumentDelegate;
use crate::model::{CustomModel, DocumentModel};
use crate::registry::{ModelRef, ModelRegistry};
use crate::storage::Storage;
use crate::text_model::{TextDocumentResolver, TextModel};
use crate::undo::UndoRedoBridge;
use crate::{Error, Result};

/// Which model variant a provider's documents use. Selected once at
/// registration; never mixed at runtime.
#[derive(Clone)]
pub enum ProviderSpec {
	/// Edit-log models driven by the custom edit protocol.
	Custom,
	/// Models delegating to a generic rich-text backend.
	Text(Arc<dyn TextDocumentResolver>),
}

/// Host-side entry point for custom-document lifecycle tracking.
pub struct DocumentHost {
	delegate: Arc<dyn DocumentDelegate>,
	storage: Arc<dyn Storage>,
	bridge: Arc<UndoRedoBridge>,
	registry: Arc<ModelRegistry>,
	autosave: AutoSaveConfig,
	providers: Mutex<HashMap<EditorKind, ProviderSpec>>,
}

impl DocumentHost {
	/// Builds a host around the delegate and storage seams.
	pub fn new(
		delegate: Arc<dyn DocumentDelegate>,
		storage: Arc<dyn Storage>,
		autosave: AutoSaveConfig,
	) -> Self {
		Self {
			delegate,
			storage,
			bridge: Arc::new(UndoRedoBridge::new()),
			registry: Arc::new(ModelRegistry::new()),
			autosave,
			providers: Mutex::new(HashMap::new()),
		}
	}

	/// The host-wide undo/redo bridge, for the shell's generic commands.
	pub fn bridge(&self) -> &Arc<UndoRedoBridge> {
		&self.bridge
	}

	/// The underlying model registry.
	pub fn registry(&self) -> &Arc<ModelRegistry> {
		&self.registry
	}

	/// Registers a provider for an editor kind.
	///
	/// # Errors
	///
	/// [`Error::DuplicateProvider`] when the kind is already registered.
	pub fn register_provider(&self, kind: EditorKind, spec: ProviderSpec) -> Result<()> {
		let mut providers = self.providers.lock();
		if providers.contains_key(&kind) {
			return Err(Error::DuplicateProvider(kind));
		}
		info!(kind = %kind, "provider registered");
		providers.insert(kind, spec);
		Ok(())
	}

	/// Deregisters a provider and force-disposes all of its documents,
	/// dirty or not. Other kinds are untouched.
	///
	/// # Errors
	///
	/// [`Error::UnknownProvider`] when the kind is not registered.
	pub async fn unregister_provider(&self, kind: &EditorKind) -> Result<()> {
		{
			let mut providers = self.providers.lock();
			if providers.remove(kind).is_none() {
				return Err(Error::UnknownProvider(kind.clone()));
			}
		}
		info!(kind = %kind, "provider deregistered");
		self.registry.dispose_all_for_kind(kind).await;
		Ok(())
	}

	/// Opens a document: retains the live model for the key or creates
	/// one through the kind's provider.
	///
	/// `backup_id` lets the external process restore from a backup
	/// instead of the resource itself.
	pub async fn open(
		&self,
		resource: ResourceId,
		kind: EditorKind,
		backup_id: Option<&str>,
	) -> Result<ModelRef> {
		let spec = self
			.providers
			.lock()
			.get(&kind)
			.cloned()
			.ok_or_else(|| Error::UnknownProvider(kind.clone()))?;
		let key = DocumentKey::new(resource, kind);

		if let Some(existing) = self.registry.try_retain(&key) {
			debug!(key = %key, "reusing live model");
			return Ok(existing);
		}

		let create = {
			let key = key.clone();
			let delegate = self.delegate.clone();
			let bridge = self.bridge.clone();
			let storage = self.storage.clone();
			let autosave = self.autosave;
			let backup_id = backup_id.map(str::to_owned);
			async move {
				match spec {
					ProviderSpec::Custom => {
						let model = CustomModel::create(
							key,
							backup_id.as_deref(),
							delegate,
							bridge,
							storage,
							autosave,
							CancellationToken::new(),
						)
						.await?;
						Ok(DocumentModel::Custom(model))
					}
					ProviderSpec::Text(resolver) => {
						let document = resolver.resolve(&key.resource).await?;
						Ok(DocumentModel::Text(Arc::new(TextModel::new(
							key, document, storage,
						))))
					}
				}
			}
		};
		self.registry.add(key, create).await
	}

	/// Hands back one reference obtained from [`open`].
	///
	/// [`open`]: Self::open
	pub async fn release(&self, model_ref: ModelRef) {
		self.registry.release(model_ref).await;
	}

	/// Inbound: the external process recorded an edit.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] when no edit-log model is registered for the
	/// key; [`Error::NotEditable`] for read-only documents.
	pub async fn on_edit(
		&self,
		resource: ResourceId,
		kind: EditorKind,
		id: EditId,
		label: Option<String>,
	) -> Result<()> {
		let key = DocumentKey::new(resource, kind);
		let model = self.registry.get(&key).await?;
		let custom = model.as_custom().ok_or_else(|| Error::NotFound(key))?;
		custom.push_edit(id, label).await
	}

	/// Inbound: the document's content changed outside the edit log.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] when no edit-log model is registered for the
	/// key.
	pub async fn on_content_changed(&self, resource: ResourceId, kind: EditorKind) -> Result<()> {
		let key = DocumentKey::new(resource, kind);
		let model = self.registry.get(&key).await?;
		let custom = model.as_custom().ok_or_else(|| Error::NotFound(key))?;
		custom.change_content();
		Ok(())
	}

	/// Tears the host down: every provider is deregistered and all
	/// documents are force-disposed.
	pub async fn dispose(&self) {
		let kinds: Vec<EditorKind> = {
			let mut providers = self.providers.lock();
			providers.drain().map(|(kind, _)| kind).collect()
		};
		for kind in kinds {
			self.registry.dispose_all_for_kind(&kind).await;
		}
	}
}
