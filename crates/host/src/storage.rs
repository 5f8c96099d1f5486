//! Byte-level storage capability.
//!
//! Read-only documents cannot round-trip a save through the external
//! process, so "save as" degrades to a plain copy through this seam. The
//! text-backed variant uses the same seam after flushing its backend.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use docket_primitives::ResourceId;
use tracing::debug;

/// Copies bytes between resources without involving any document model.
#[async_trait]
pub trait Storage: Send + Sync {
	/// Copies `source` to `target`, replacing an existing target.
	async fn copy(&self, source: &ResourceId, target: &ResourceId) -> io::Result<()>;
}

/// Filesystem-backed storage treating resource ids as paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

#[async_trait]
impl Storage for FsStorage {
	async fn copy(&self, source: &ResourceId, target: &ResourceId) -> io::Result<()> {
		let bytes =
			tokio::fs::copy(Path::new(source.as_str()), Path::new(target.as_str())).await?;
		debug!(source = %source, target = %target, bytes, "copied resource");
		Ok(())
	}
}
