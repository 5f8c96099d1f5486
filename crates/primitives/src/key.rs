//! Identity types for custom documents.
//!
//! A logical document is addressed by a [`DocumentKey`]: the pair of the
//! resource it is backed by and the editor kind that owns it. Any number of
//! views may reference the same key; the host guarantees at most one live
//! model per key.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque identity of an editable resource (URI-shaped string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
	/// Creates a resource identity from its string form.
	pub fn new(uri: impl Into<Arc<str>>) -> Self {
		Self(uri.into())
	}

	/// Returns the string form of the resource identity.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ResourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ResourceId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// Identifier of the custom-editor provider that owns a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorKind(Arc<str>);

impl EditorKind {
	/// Creates an editor-kind identifier.
	pub fn new(kind: impl Into<Arc<str>>) -> Self {
		Self(kind.into())
	}

	/// Returns the string form of the kind.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EditorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for EditorKind {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// Composite identity of one logical document instance.
///
/// Identifies exactly one document regardless of how many views reference
/// it. Cheap to clone; both components are shared strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
	/// Backing resource.
	pub resource: ResourceId,
	/// Owning editor kind.
	pub kind: EditorKind,
}

impl DocumentKey {
	/// Creates a key from its components.
	pub fn new(resource: ResourceId, kind: EditorKind) -> Self {
		Self { resource, kind }
	}
}

impl fmt::Display for DocumentKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.resource, self.kind)
	}
}

/// Opaque handle for one undoable edit.
///
/// Minted by the external process; the host attaches no meaning beyond
/// identity and ordering within the edit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditId(pub u64);

impl fmt::Display for EditId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Persisted view state, sufficient to re-resolve the same document after
/// a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
	/// String form of the backing resource identity.
	pub resource: String,
}

impl ViewState {
	/// Captures the view state for a resource.
	pub fn for_resource(resource: &ResourceId) -> Self {
		Self {
			resource: resource.as_str().to_owned(),
		}
	}

	/// Re-resolves the document key under the given editor kind.
	pub fn key(&self, kind: EditorKind) -> DocumentKey {
		DocumentKey::new(ResourceId::new(self.resource.as_str()), kind)
	}
}
