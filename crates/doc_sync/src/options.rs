//! Configuration for document synchronization.

use std::rc::Rc;

use serde::Deserialize;

use crate::OffsetEncoding;

/// Transform applied to a handle's grammar name before it becomes a `languageId`.
///
/// The result is always lower-cased afterwards.
pub type LanguageIdMapper = Rc<dyn Fn(&str) -> String>;

/// Tunables shared by every session of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncOptions {
	/// Units used for incremental change columns and `rangeLength`.
	pub offset_encoding: OffsetEncoding,
	/// Send `didOpen` on the first save of a document that had no location when its session
	/// was created.
	///
	/// Without this, such a document is never opened with the server.
	///
	/// Changes made after the document gains a location but before that save are still sent,
	/// so the `didOpen` follows them and carries the version they advanced to.
	pub open_on_save: bool,
}

impl Default for SyncOptions {
	fn default() -> Self {
		Self {
			offset_encoding: OffsetEncoding::default(),
			open_on_save: true,
		}
	}
}

impl SyncOptions {
	/// Create options with defaults.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the offset encoding.
	pub fn offset_encoding(mut self, encoding: OffsetEncoding) -> Self {
		self.offset_encoding = encoding;
		self
	}

	/// Set whether a deferred document is opened on its first located save.
	pub fn open_on_save(mut self, open_on_save: bool) -> Self {
		self.open_on_save = open_on_save;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let options = SyncOptions::default();
		assert_eq!(options.offset_encoding, OffsetEncoding::Utf16);
		assert!(options.open_on_save);
	}

	#[test]
	fn test_builder() {
		let options = SyncOptions::new().offset_encoding(OffsetEncoding::Utf8).open_on_save(false);
		assert_eq!(options.offset_encoding, OffsetEncoding::Utf8);
		assert!(!options.open_on_save);
	}

	#[test]
	fn test_deserialize_partial() {
		let options: SyncOptions = serde_json::from_value(serde_json::json!({ "offsetEncoding": "utf-32" })).unwrap();
		assert_eq!(options.offset_encoding, OffsetEncoding::Utf32);
		assert!(options.open_on_save);

		let options: SyncOptions = serde_json::from_value(serde_json::json!({ "openOnSave": false })).unwrap();
		assert_eq!(options.offset_encoding, OffsetEncoding::Utf16);
		assert!(!options.open_on_save);
	}
}
