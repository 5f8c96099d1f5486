//! Linear edit log with a save point.
//!
//! The log records opaque edit handles in application order, together with
//! two cursors: `current`, the last edit currently applied, and
//! `save_point`, the edit believed persisted. `None` means "before the
//! first edit" for either cursor.
//!
//! Pushing while `current` is not at the end cuts the redo branch; the cut
//! ids are returned so the host can report them for disposal exactly once.
//! No redo survives a revert.

use crate::key::EditId;

/// One opaque edit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
	/// Handle minted by the external process.
	pub id: EditId,
	/// Optional human-readable label ("Typing", "Rotate", ...).
	pub label: Option<String>,
}

impl EditRecord {
	/// Creates a record from a handle and an optional label.
	pub fn new(id: EditId, label: Option<String>) -> Self {
		Self { id, label }
	}
}

/// Ordered edit history with applied and persisted cursors.
///
/// Invariants, maintained by every operation:
/// - `current` and `save_point` are `None` or valid indices into `edits`;
/// - after [`push`], `current` is the last index.
///
/// [`push`]: Self::push
#[derive(Debug, Default, Clone)]
pub struct EditLog {
	edits: Vec<EditRecord>,
	current: Option<usize>,
	save_point: Option<usize>,
}

impl EditLog {
	/// Creates an empty log with both cursors before the first edit.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of recorded edits.
	pub fn len(&self) -> usize {
		self.edits.len()
	}

	/// Returns `true` when no edits are recorded.
	pub fn is_empty(&self) -> bool {
		self.edits.is_empty()
	}

	/// Index of the edit currently applied, if any.
	pub fn current_index(&self) -> Option<usize> {
		self.current
	}

	/// Index of the edit believed persisted, if any.
	pub fn save_point_index(&self) -> Option<usize> {
		self.save_point
	}

	/// Returns `true` when the applied cursor sits at the save point.
	///
	/// An empty log is always at its save point; raw content changes are
	/// tracked outside the log.
	pub fn at_save_point(&self) -> bool {
		self.edits.is_empty() || self.save_point == self.current
	}

	/// Appends an edit, cutting the redo branch first.
	///
	/// Returns the ids removed by the cut, in log order; the caller must
	/// report each of them for disposal exactly once. If the save point
	/// pointed into the removed branch it is cleared, keeping it a valid
	/// index.
	pub fn push(&mut self, record: EditRecord) -> Vec<EditId> {
		let start = self.current.map_or(0, |i| i + 1);
		let removed: Vec<EditId> = self.edits.drain(start..).map(|r| r.id).collect();
		if self.save_point.is_some_and(|sp| sp >= start) {
			self.save_point = None;
		}
		self.edits.push(record);
		self.current = Some(self.edits.len() - 1);
		removed
	}

	/// Steps the applied cursor back one edit.
	///
	/// Returns the id of the edit that was undone, or `None` when already
	/// before the first edit.
	pub fn undo(&mut self) -> Option<EditId> {
		let index = self.current?;
		let id = self.edits[index].id;
		self.current = index.checked_sub(1);
		Some(id)
	}

	/// Steps the applied cursor forward one edit.
	///
	/// Returns the id of the edit that was reapplied, or `None` when
	/// already at the end of the log.
	pub fn redo(&mut self) -> Option<EditId> {
		let next = self.current.map_or(0, |i| i + 1);
		if next >= self.edits.len() {
			return None;
		}
		self.current = Some(next);
		Some(self.edits[next].id)
	}

	/// Rewinds the applied cursor to the save point and drops everything
	/// after it.
	///
	/// Returns the dropped ids for disposal. The dropped edits are
	/// permanently unreachable: no redo survives a revert.
	pub fn revert_to_save_point(&mut self) -> Vec<EditId> {
		self.current = self.save_point;
		let start = self.current.map_or(0, |i| i + 1);
		self.edits.drain(start..).map(|r| r.id).collect()
	}

	/// Moves the save point to the applied cursor.
	pub fn mark_saved(&mut self) {
		self.save_point = self.current;
	}
}
