//! The outbound side of a language server connection.

use lsp_types::notification::{
	DidChangeTextDocument, DidChangeWatchedFiles, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument,
};
use lsp_types::{
	DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
	DidSaveTextDocumentParams,
};

use crate::{AnyNotification, Result};

/// A connected, synchronous-call capable channel to a language server.
///
/// Only [`notify`](Self::notify) is required. The typed methods serialize their params and
/// forward to it, so an implementation sees every notification in emission order.
///
/// A failed send is returned to the caller as-is. Sessions never retry: a retried change
/// would carry a stale version.
pub trait Connection {
	/// Send a notification to the server.
	fn notify(&self, notif: AnyNotification) -> Result<()>;

	/// Notify the server that a document was opened.
	fn text_document_did_open(&self, params: DidOpenTextDocumentParams) -> Result<()> {
		self.notify(AnyNotification::new::<DidOpenTextDocument>(params)?)
	}

	/// Notify the server that a document changed.
	fn text_document_did_change(&self, params: DidChangeTextDocumentParams) -> Result<()> {
		self.notify(AnyNotification::new::<DidChangeTextDocument>(params)?)
	}

	/// Notify the server that a document was closed.
	fn text_document_did_close(&self, params: DidCloseTextDocumentParams) -> Result<()> {
		self.notify(AnyNotification::new::<DidCloseTextDocument>(params)?)
	}

	/// Notify the server that a document was saved.
	fn text_document_did_save(&self, params: DidSaveTextDocumentParams) -> Result<()> {
		self.notify(AnyNotification::new::<DidSaveTextDocument>(params)?)
	}

	/// Notify the server that watched files changed on disk.
	fn workspace_did_change_watched_files(&self, params: DidChangeWatchedFilesParams) -> Result<()> {
		self.notify(AnyNotification::new::<DidChangeWatchedFiles>(params)?)
	}
}
