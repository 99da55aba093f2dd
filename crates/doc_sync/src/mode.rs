//! The synchronization mode negotiated from server capabilities.

use lsp_types::{ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind};
use serde::Deserialize;

use crate::{Error, Result};

/// How document changes are sent to the server.
///
/// Decided once, before a coordinator exists, and fixed for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
	/// Every change resends the whole document.
	Full,
	/// Changes carry only the edited ranges.
	Incremental,
}

impl SyncMode {
	/// Map a protocol sync kind. `None` and unknown kinds have no mode.
	pub fn from_kind(kind: TextDocumentSyncKind) -> Option<Self> {
		match kind {
			TextDocumentSyncKind::INCREMENTAL => Some(Self::Incremental),
			TextDocumentSyncKind::FULL => Some(Self::Full),
			_ => None,
		}
	}

	/// Read the mode advertised in `textDocumentSync`, in either its kind or options shape.
	pub fn from_capabilities(capabilities: &ServerCapabilities) -> Option<Self> {
		let kind = match capabilities.text_document_sync.as_ref()? {
			TextDocumentSyncCapability::Kind(kind) => *kind,
			TextDocumentSyncCapability::Options(options) => options.change?,
		};
		Self::from_kind(kind)
	}

	/// Whether a coordinator can be built for a server with these capabilities.
	pub fn can_activate(capabilities: &ServerCapabilities) -> bool {
		Self::from_capabilities(capabilities).is_some()
	}

	/// Like [`from_capabilities`](Self::from_capabilities), failing with
	/// [`Error::UnsupportedSync`] when no usable mode is advertised.
	pub fn negotiate(capabilities: &ServerCapabilities) -> Result<Self> {
		Self::from_capabilities(capabilities).ok_or(Error::UnsupportedSync)
	}
}
