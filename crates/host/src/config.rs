//! Autosave configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether edits schedule a debounced save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoSaveMode {
	/// Every change re-arms a single debounced save timer.
	On,
	/// Saves happen only on request.
	Off,
}

/// Returns the default autosave mode.
fn default_mode() -> AutoSaveMode {
	AutoSaveMode::Off
}

/// Returns the default autosave debounce in milliseconds.
fn default_delay_ms() -> u64 {
	1000
}

/// Per-document autosave policy, fixed at model creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveConfig {
	/// Autosave mode.
	#[serde(default = "default_mode")]
	pub mode: AutoSaveMode,
	/// Debounce delay in milliseconds.
	#[serde(default = "default_delay_ms")]
	pub delay_ms: u64,
}

impl Default for AutoSaveConfig {
	fn default() -> Self {
		Self {
			mode: default_mode(),
			delay_ms: default_delay_ms(),
		}
	}
}

impl AutoSaveConfig {
	/// Autosave with the given debounce.
	pub fn on(delay: Duration) -> Self {
		Self {
			mode: AutoSaveMode::On,
			delay_ms: delay.as_millis() as u64,
		}
	}

	/// Returns `true` when changes should schedule a save.
	pub fn is_on(&self) -> bool {
		self.mode == AutoSaveMode::On
	}

	/// The debounce delay.
	pub fn delay(&self) -> Duration {
		Duration::from_millis(self.delay_ms)
	}
}
