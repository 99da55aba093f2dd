//! Text document synchronization between an editing host and a language server.
//!
//! This crate keeps the live state of locally edited documents in step with a
//! language server over `textDocument/*` notifications. It owns two things:
//!
//! * [`SyncCoordinator`]: decides nothing but the [`SyncMode`] (once, from the server's
//!   capabilities), watches the host's stream of document handles, and manages one
//!   [`DocumentSyncSession`] per eligible document.
//! * [`DocumentSyncSession`]: one document's version counter and subscriptions. Turns host
//!   edit/save/destroy events into `didOpen`, `didChange`, `didSave`,
//!   `workspace/didChangeWatchedFiles` and `didClose`.
//!
//! ```text
//! ┌────────────┐ handles ┌─────────────────┐ creates ┌────────────────────┐ notifications ┌────────────┐
//! │    Host    │────────▶│ SyncCoordinator │────────▶│ DocumentSyncSession│──────────────▶│ Connection │
//! └────────────┘         └─────────────────┘         └────────────────────┘               └────────────┘
//! ```
//!
//! Everything runs synchronously inside the host's own event callbacks. There are no
//! background tasks and no locks: the version counter, the managed set and notification
//! order are race-free because dispatch is single-threaded.
//!
//! The transport, server process lifecycle and diagnostics handling live elsewhere; this
//! crate only needs something implementing [`Connection`].
#![warn(missing_docs)]
use std::io;
use std::path::{Path, PathBuf};

/// Re-export of the [`lsp_types`] dependency of this crate.
pub use lsp_types;
pub use serde_json::Value as JsonValue;

mod connection;
mod coordinator;
mod document;
mod encoding;
mod event;
mod mode;
mod options;
mod position;
mod session;
mod types;

#[cfg(test)]
mod test_support;

pub use connection::Connection;
pub use coordinator::{Selector, SyncCoordinator, SyncCoordinatorBuilder};
pub use document::{ChangeBatch, DocumentHandle, DocumentHost, DocumentId, TextEdit, TextPoint, TextRange};
pub use encoding::OffsetEncoding;
pub use event::{CompositeSubscription, Emitter, Listener, Subscription};
pub use mode::SyncMode;
pub use options::{LanguageIdMapper, SyncOptions};
pub use position::{char_range_to_lsp_range, char_to_lsp_position};
pub use session::{DocumentSyncSession, SessionState};
pub use types::AnyNotification;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// Notification params could not be serialized.
	#[error("serialization failed: {0}")]
	Serialize(String),
	/// The peer violates the Language Server Protocol.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// Input/output errors from the underlying connection.
	#[error("{0}")]
	Io(String),
	/// A notification needs a document URI but the document has no persisted location.
	#[error("document {0} has no persisted location")]
	MissingIdentity(DocumentId),
	/// A document location cannot be expressed as a `file://` URI.
	#[error("cannot derive a URI from path {}", .0.display())]
	InvalidPath(PathBuf),
	/// The server advertises neither full nor incremental text document sync.
	#[error("server does not advertise full or incremental text document sync")]
	UnsupportedSync,
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Self {
		Self::Serialize(e.to_string())
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::Io(e.to_string())
	}
}

/// Converts a filesystem path to an LSP URI.
///
/// Relative paths are resolved against the current working directory. The filesystem is
/// never touched, so the same path always yields the same URI.
/// Returns `None` if the path cannot be converted.
pub fn uri_from_path(path: &Path) -> Option<lsp_types::Uri> {
	use std::str::FromStr;

	let abs_path = if path.is_absolute() {
		path.to_path_buf()
	} else {
		std::env::current_dir().ok()?.join(path)
	};

	let url = url::Url::from_file_path(abs_path).ok()?;
	lsp_types::Uri::from_str(url.as_str()).ok()
}
