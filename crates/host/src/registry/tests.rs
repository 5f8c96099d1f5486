use std::sync::Arc;

use docket_primitives::{DocumentKey, EditId};
use tokio_util::sync::CancellationToken;

use super::ModelRegistry;
use crate::Result;
use crate::config::AutoSaveConfig;
use crate::model::{CustomModel, DocumentModel};
use crate::test_support::{Call, MemStorage, MockDelegate};
use crate::undo::UndoRedoBridge;

fn key(resource: &str, kind: &str) -> DocumentKey {
	DocumentKey::new(resource.into(), kind.into())
}

async fn build_model(key: DocumentKey, delegate: Arc<MockDelegate>) -> Result<DocumentModel> {
	let model = CustomModel::create(
		key,
		None,
		delegate,
		Arc::new(UndoRedoBridge::new()),
		Arc::new(MemStorage::default()),
		AutoSaveConfig::default(),
		CancellationToken::new(),
	)
	.await?;
	Ok(DocumentModel::Custom(model))
}

async fn settle() {
	for _ in 0..8 {
		tokio::task::yield_now().await;
	}
}

#[tokio::test]
async fn retain_misses_leave_no_trace() {
	let registry = Arc::new(ModelRegistry::new());
	assert!(registry.try_retain(&key("file:///a", "drawio")).is_none());
	assert!(registry.is_empty());
}

#[tokio::test]
async fn add_then_retain_yield_the_same_instance() {
	let registry = Arc::new(ModelRegistry::new());
	let delegate = MockDelegate::new();
	let k = key("file:///a", "drawio");

	let first = registry
		.add(k.clone(), build_model(k.clone(), delegate.clone()))
		.await
		.unwrap();
	let second = registry.try_retain(&k).unwrap();

	let a = first.model().await.unwrap();
	let b = second.model().await.unwrap();
	assert!(Arc::ptr_eq(a.as_custom().unwrap(), b.as_custom().unwrap()));
	assert_eq!(registry.len(), 1);
	assert_eq!(delegate.count(|c| matches!(c, Call::Create { .. })), 1);

	// One reference keeps the model alive.
	registry.release(first).await;
	assert_eq!(registry.len(), 1);
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		0
	);

	// The last one disposes it.
	registry.release(second).await;
	assert!(registry.is_empty());
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		1
	);
}

#[tokio::test]
async fn releasing_a_dirty_model_defers_disposal_until_clean() {
	let registry = Arc::new(ModelRegistry::new());
	let delegate = MockDelegate::new();
	let k = key("file:///a", "drawio");

	let held = registry
		.add(k.clone(), build_model(k.clone(), delegate.clone()))
		.await
		.unwrap();
	let model = held.model().await.unwrap();
	let custom = model.as_custom().unwrap().clone();
	custom.push_edit(EditId(1), None).await.unwrap();

	registry.release(held).await;
	settle().await;

	// Still registered and alive while dirty.
	assert_eq!(registry.len(), 1);
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		0
	);

	// First clean transition finalizes the deferred disposal.
	custom.save().await.unwrap();
	settle().await;
	assert!(registry.is_empty());
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		1
	);
}

#[tokio::test]
async fn retaining_during_deferral_cancels_it() {
	let registry = Arc::new(ModelRegistry::new());
	let delegate = MockDelegate::new();
	let k = key("file:///a", "drawio");

	let held = registry
		.add(k.clone(), build_model(k.clone(), delegate.clone()))
		.await
		.unwrap();
	let custom = held.model().await.unwrap().as_custom().unwrap().clone();
	custom.push_edit(EditId(1), None).await.unwrap();

	registry.release(held).await;
	let resurrected = registry.try_retain(&k).unwrap();

	// The clean transition finds a nonzero count and leaves the entry.
	custom.save().await.unwrap();
	settle().await;
	assert_eq!(registry.len(), 1);
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		0
	);

	registry.release(resurrected).await;
	assert!(registry.is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn concurrent_adds_share_one_creation() {
	let registry = Arc::new(ModelRegistry::new());
	let delegate = MockDelegate::new();
	delegate.set_block_creates(true);
	let k = key("file:///a", "drawio");

	let first = tokio::spawn({
		let registry = registry.clone();
		let delegate = delegate.clone();
		let k = k.clone();
		async move {
			let create = build_model(k.clone(), delegate);
			registry.add(k, create).await
		}
	});
	settle().await;

	let second = tokio::spawn({
		let registry = registry.clone();
		let delegate = delegate.clone();
		let k = k.clone();
		async move {
			let create = build_model(k.clone(), delegate);
			registry.add(k, create).await
		}
	});
	settle().await;

	delegate.finish_create(true);
	let first = first.await.unwrap().unwrap();
	let second = second.await.unwrap().unwrap();

	// Exactly one creation reached the delegate; both references resolve
	// to it.
	assert_eq!(delegate.count(|c| matches!(c, Call::Create { .. })), 1);
	let a = first.model().await.unwrap();
	let b = second.model().await.unwrap();
	assert!(Arc::ptr_eq(a.as_custom().unwrap(), b.as_custom().unwrap()));

	registry.release(first).await;
	registry.release(second).await;
	assert!(registry.is_empty());
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		1
	);
}

#[tokio::test]
async fn failed_creation_clears_the_slot() {
	let registry = Arc::new(ModelRegistry::new());
	let k = key("file:///a", "drawio");

	let outcome = registry
		.add(k.clone(), async {
			Err(crate::Error::Delegate(anyhow::anyhow!(
				"external process refused"
			)))
		})
		.await;
	assert!(outcome.is_err());
	assert!(registry.is_empty());
	assert!(matches!(
		registry.get(&k).await,
		Err(crate::Error::NotFound(_))
	));
}

#[tokio::test]
async fn get_resolves_without_touching_the_count() {
	let registry = Arc::new(ModelRegistry::new());
	let delegate = MockDelegate::new();
	let k = key("file:///a", "drawio");

	let held = registry
		.add(k.clone(), build_model(k.clone(), delegate.clone()))
		.await
		.unwrap();
	registry.get(&k).await.unwrap();

	// The lookup added no reference: one release still disposes.
	registry.release(held).await;
	assert!(registry.is_empty());
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		1
	);
}

#[tokio::test]
async fn stale_references_do_not_touch_a_recreated_entry() {
	let registry = Arc::new(ModelRegistry::new());
	let delegate = MockDelegate::new();
	let k = key("file:///a", "drawio");

	let stale = registry
		.add(k.clone(), build_model(k.clone(), delegate.clone()))
		.await
		.unwrap();
	registry.dispose_all_for_kind(&"drawio".into()).await;
	assert!(registry.is_empty());
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		1
	);

	// The key is reoccupied by a fresh entry with one live holder.
	let held = registry
		.add(k.clone(), build_model(k.clone(), delegate.clone()))
		.await
		.unwrap();

	// Handing back the ref from the replaced entry must not drain the
	// new entry's count.
	registry.release(stale).await;
	assert_eq!(registry.len(), 1);
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		1
	);
	held.model().await.unwrap();

	registry.release(held).await;
	assert!(registry.is_empty());
	assert_eq!(
		delegate.count(|c| matches!(c, Call::DisposeDocument { .. })),
		2
	);
}

#[tokio::test]
async fn dispose_all_for_kind_spares_other_kinds() {
	let registry = Arc::new(ModelRegistry::new());
	let delegate = MockDelegate::new();
	let drawio = key("file:///a", "drawio");
	let hex = key("file:///a", "hex");

	let held_drawio = registry
		.add(drawio.clone(), build_model(drawio.clone(), delegate.clone()))
		.await
		.unwrap();
	let held_hex = registry
		.add(hex.clone(), build_model(hex.clone(), delegate.clone()))
		.await
		.unwrap();

	// Force-disposal ignores the outstanding reference and dirty state.
	let custom = held_drawio.model().await.unwrap().as_custom().unwrap().clone();
	custom.push_edit(EditId(1), None).await.unwrap();
	registry.dispose_all_for_kind(&"drawio".into()).await;

	assert_eq!(registry.len(), 1);
	assert!(matches!(
		registry.get(&drawio).await,
		Err(crate::Error::NotFound(_))
	));
	registry.get(&hex).await.unwrap();

	// The surviving reference to the disposed entry is a no-op to hand
	// back.
	registry.release(held_drawio).await;
	registry.release(held_hex).await;
	assert!(registry.is_empty());
}
