//! Per-document synchronization state.
//!
//! A [`DocumentSyncSession`] owns one document's protocol version and its three host
//! subscriptions (change, save, destroy). It moves through [`SessionState`]:
//!
//! ```text
//!   Unopened ──didOpen──▶ Open
//!      │                   │
//!      └──────destroy──────┴──▶ Closed (terminal)
//! ```
//!
//! `didOpen` is attempted once, when the session is created. A document without a location
//! at that moment stays Unopened; with [`SyncOptions::open_on_save`] its first located save
//! opens it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use lsp_types::{
	DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
	DidSaveTextDocumentParams, FileChangeType, FileEvent, TextDocumentContentChangeEvent, TextDocumentIdentifier,
	TextDocumentItem, Uri, VersionedTextDocumentIdentifier,
};

use crate::{
	ChangeBatch, CompositeSubscription, Connection, DocumentHandle, DocumentId, Error, LanguageIdMapper, Listener,
	Result, SyncMode, SyncOptions, TextEdit, uri_from_path,
};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	/// No `didOpen` has been sent.
	Unopened,
	/// `didOpen` was sent; changes and saves flow to the server.
	Open,
	/// Subscriptions are gone. Nothing is emitted any more.
	Closed,
}

/// Synchronizes one document with the server.
#[derive(Clone)]
pub struct DocumentSyncSession<H: DocumentHandle> {
	inner: Rc<SessionInner<H>>,
}

struct SessionInner<H> {
	handle: H,
	connection: Rc<dyn Connection>,
	mode: SyncMode,
	options: SyncOptions,
	language_id_mapper: Option<LanguageIdMapper>,
	state: Cell<SessionState>,
	/// Version of the last `didOpen`/`didChange` sent (or to be sent by `didOpen`).
	version: Cell<i32>,
	subscriptions: RefCell<CompositeSubscription>,
}

impl<H: DocumentHandle> DocumentSyncSession<H> {
	/// Create a session and send `didOpen` if the document already has a location.
	pub fn new(
		handle: H,
		connection: Rc<dyn Connection>,
		mode: SyncMode,
		options: SyncOptions,
		language_id_mapper: Option<LanguageIdMapper>,
	) -> Result<Self> {
		let session = Self::attach(handle, connection, mode, options, language_id_mapper);
		session.inner.did_open()?;
		Ok(session)
	}

	/// Create a session and subscribe to the handle without sending anything.
	pub(crate) fn attach(
		handle: H,
		connection: Rc<dyn Connection>,
		mode: SyncMode,
		options: SyncOptions,
		language_id_mapper: Option<LanguageIdMapper>,
	) -> Self {
		let inner = Rc::new(SessionInner {
			handle,
			connection,
			mode,
			options,
			language_id_mapper,
			state: Cell::new(SessionState::Unopened),
			version: Cell::new(1),
			subscriptions: RefCell::new(CompositeSubscription::new()),
		});

		let weak = Rc::downgrade(&inner);
		let on_change = match mode {
			SyncMode::Full => listen(&weak, |inner, batch: &ChangeBatch| inner.send_full_changes(batch)),
			SyncMode::Incremental => listen(&weak, |inner, batch: &ChangeBatch| inner.send_incremental_changes(batch)),
		};
		let change = inner.handle.on_did_change(on_change);
		let save = inner.handle.on_did_save(listen(&weak, |inner, _: &()| inner.did_save()));
		let destroy = inner.handle.on_did_destroy(listen(&weak, |inner, _: &()| inner.destroy()));

		let mut subscriptions = inner.subscriptions.borrow_mut();
		subscriptions.add(change);
		subscriptions.add(save);
		subscriptions.add(destroy);
		drop(subscriptions);

		Self { inner }
	}

	/// Send the construction-time `didOpen`, if the document has a location.
	pub(crate) fn open(&self) -> Result<()> {
		self.inner.did_open()
	}

	/// The host handle this session tracks.
	pub fn handle(&self) -> &H {
		&self.inner.handle
	}

	/// Key of the tracked handle.
	pub fn id(&self) -> DocumentId {
		self.inner.handle.id()
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SessionState {
		self.inner.state.get()
	}

	/// Version of the most recent `didOpen`/`didChange`. Starts at 1.
	pub fn version(&self) -> i32 {
		self.inner.version.get()
	}

	/// The sync mode used for changes.
	pub fn mode(&self) -> SyncMode {
		self.inner.mode
	}

	/// The document URI as of now, re-derived from the handle's location.
	pub fn uri(&self) -> Result<Option<Uri>> {
		self.inner.uri()
	}

	/// The `languageId` sent with `didOpen`.
	pub fn language_id(&self) -> String {
		self.inner.language_id()
	}

	/// Unsubscribe and send `didClose` if the document has a location.
	///
	/// Does nothing once the session is Closed.
	pub fn destroy(&self) -> Result<()> {
		self.inner.destroy()
	}

	/// Unsubscribe without notifying the server.
	pub fn dispose(&self) {
		self.inner.dispose();
	}
}

impl<H: DocumentHandle> std::fmt::Debug for DocumentSyncSession<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DocumentSyncSession")
			.field("id", &self.id())
			.field("state", &self.state())
			.field("version", &self.version())
			.field("mode", &self.mode())
			.finish_non_exhaustive()
	}
}

fn listen<H, E>(weak: &Weak<SessionInner<H>>, f: fn(&SessionInner<H>, &E) -> Result<()>) -> Listener<E>
where
	H: DocumentHandle,
	E: 'static,
{
	let weak = weak.clone();
	Box::new(move |event| match weak.upgrade() {
		Some(inner) => f(&inner, event),
		None => Ok(()),
	})
}

impl<H: DocumentHandle> SessionInner<H> {
	fn uri(&self) -> Result<Option<Uri>> {
		match self.handle.path() {
			None => Ok(None),
			Some(path) => uri_from_path(&path).map(Some).ok_or(Error::InvalidPath(path)),
		}
	}

	fn language_id(&self) -> String {
		let grammar = self.handle.grammar();
		let language_id = match &self.language_id_mapper {
			Some(map) => map(&grammar),
			None => grammar,
		};
		language_id.to_lowercase()
	}

	fn did_open(&self) -> Result<()> {
		if self.state.get() != SessionState::Unopened {
			return Ok(());
		}
		let Some(uri) = self.uri()? else {
			tracing::debug!(id = %self.handle.id(), "document has no location, deferring didOpen");
			return Ok(());
		};
		self.send_open(uri)
	}

	fn send_open(&self, uri: Uri) -> Result<()> {
		let version = self.version.get();
		let language_id = self.language_id();
		tracing::debug!(uri = uri.as_str(), language_id = language_id.as_str(), version, "didOpen");

		self.connection.text_document_did_open(DidOpenTextDocumentParams {
			text_document: TextDocumentItem {
				uri,
				language_id,
				version,
				text: self.handle.text(),
			},
		})?;
		// A destroy fired while didOpen was in flight has already closed the session.
		if self.state.get() == SessionState::Unopened {
			self.state.set(SessionState::Open);
		}
		Ok(())
	}

	fn send_full_changes(&self, batch: &ChangeBatch) -> Result<()> {
		let Some(uri) = self.change_target(batch)? else {
			return Ok(());
		};
		let content_changes = vec![TextDocumentContentChangeEvent {
			range: None,
			range_length: None,
			text: self.handle.text(),
		}];
		self.send_change(uri, content_changes)
	}

	fn send_incremental_changes(&self, batch: &ChangeBatch) -> Result<()> {
		let Some(uri) = self.change_target(batch)? else {
			return Ok(());
		};
		let content_changes = batch.iter().map(|edit| self.content_change(edit)).collect();
		self.send_change(uri, content_changes)
	}

	/// URI to send `batch` to, or `None` when the batch must not produce a notification.
	fn change_target(&self, batch: &ChangeBatch) -> Result<Option<Uri>> {
		if self.state.get() == SessionState::Closed {
			return Ok(None);
		}
		if batch.is_empty() {
			tracing::trace!(id = %self.handle.id(), "ignoring empty change batch");
			return Ok(None);
		}
		let uri = self.uri()?;
		if uri.is_none() {
			tracing::trace!(id = %self.handle.id(), edits = batch.len(), "document has no location, dropping changes");
		}
		Ok(uri)
	}

	fn content_change(&self, edit: &TextEdit) -> TextDocumentContentChangeEvent {
		TextDocumentContentChangeEvent {
			range: Some(edit.old_range.into()),
			range_length: Some(self.options.offset_encoding.text_len(&edit.old_text)),
			text: edit.new_text.clone(),
		}
	}

	fn send_change(&self, uri: Uri, content_changes: Vec<TextDocumentContentChangeEvent>) -> Result<()> {
		let version = self.version.get() + 1;
		self.version.set(version);
		tracing::trace!(uri = uri.as_str(), version, changes = content_changes.len(), "didChange");

		self.connection.text_document_did_change(DidChangeTextDocumentParams {
			text_document: VersionedTextDocumentIdentifier { uri, version },
			content_changes,
		})
	}

	fn did_save(&self) -> Result<()> {
		if self.state.get() == SessionState::Closed {
			return Ok(());
		}
		let uri = self.uri()?.ok_or(Error::MissingIdentity(self.handle.id()))?;

		if self.state.get() == SessionState::Unopened && self.options.open_on_save {
			self.send_open(uri.clone())?;
			if self.state.get() == SessionState::Closed {
				return Ok(());
			}
		}

		tracing::debug!(uri = uri.as_str(), "didSave");
		self.connection.text_document_did_save(DidSaveTextDocumentParams {
			text_document: TextDocumentIdentifier { uri: uri.clone() },
			text: None,
		})?;
		if self.state.get() == SessionState::Closed {
			return Ok(());
		}
		self.connection.workspace_did_change_watched_files(DidChangeWatchedFilesParams {
			changes: vec![FileEvent {
				uri,
				typ: FileChangeType::CHANGED,
			}],
		})
	}

	fn destroy(&self) -> Result<()> {
		if self.state.get() == SessionState::Closed {
			return Ok(());
		}
		// Unsubscribe before notifying so events fired during teardown cannot reach us.
		self.dispose();

		let Some(uri) = self.uri()? else {
			tracing::debug!(id = %self.handle.id(), "document never had a location, skipping didClose");
			return Ok(());
		};
		tracing::debug!(uri = uri.as_str(), "didClose");
		self.connection
			.text_document_did_close(DidCloseTextDocumentParams {
				text_document: TextDocumentIdentifier { uri },
			})
			.inspect_err(|e| tracing::warn!(error = %e, "didClose failed"))
	}

	fn dispose(&self) {
		self.state.set(SessionState::Closed);
		self.subscriptions.borrow_mut().dispose();
	}
}
