//! Host and connection doubles shared by unit tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use lsp_types::Uri;
use lsp_types::notification::Notification;

use crate::{
	AnyNotification, ChangeBatch, Connection, DocumentHandle, DocumentHost, DocumentId, Emitter, Error, Listener, Result,
	Subscription, TextEdit, TextPoint, TextRange, uri_from_path,
};

pub(crate) fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Connection that records notifications in order.
/// Methods listed in `fail_methods` are recorded and then fail.
#[derive(Default)]
pub(crate) struct RecordingConnection {
	notifications: RefCell<Vec<AnyNotification>>,
	fail_methods: RefCell<HashSet<String>>,
	on_notify: RefCell<Option<Box<dyn Fn(&AnyNotification)>>>,
}

impl RecordingConnection {
	pub(crate) fn new() -> Rc<Self> {
		init_tracing();
		Rc::new(Self::default())
	}

	pub(crate) fn set_fail_method(&self, method: &str) {
		self.fail_methods.borrow_mut().insert(method.to_string());
	}

	pub(crate) fn clear_fail_method(&self, method: &str) {
		self.fail_methods.borrow_mut().remove(method);
	}

	/// Run `hook` after each notification is recorded, to simulate re-entrant hosts.
	pub(crate) fn set_on_notify(&self, hook: impl Fn(&AnyNotification) + 'static) {
		*self.on_notify.borrow_mut() = Some(Box::new(hook));
	}

	pub(crate) fn recorded(&self) -> Vec<AnyNotification> {
		self.notifications.borrow().clone()
	}

	pub(crate) fn recorded_methods(&self) -> Vec<String> {
		self.notifications.borrow().iter().map(|n| n.method.clone()).collect()
	}

	pub(crate) fn clear_recordings(&self) {
		self.notifications.borrow_mut().clear();
	}

	/// Typed params of every recorded `N` notification, in order.
	pub(crate) fn params_of<N: Notification>(&self) -> Vec<N::Params> {
		self.notifications
			.borrow()
			.iter()
			.filter_map(|n| n.parse::<N>())
			.map(|params| params.expect("recorded params decode"))
			.collect()
	}
}

impl Connection for RecordingConnection {
	fn notify(&self, notif: AnyNotification) -> Result<()> {
		self.notifications.borrow_mut().push(notif.clone());
		if let Some(hook) = self.on_notify.borrow().as_ref() {
			hook(&notif);
		}
		if self.fail_methods.borrow().contains(&notif.method) {
			return Err(Error::Protocol(format!("injected failure for {}", notif.method)));
		}
		Ok(())
	}
}

struct TestDocumentInner {
	id: DocumentId,
	text: RefCell<String>,
	path: RefCell<Option<PathBuf>>,
	grammar: String,
	changed: Emitter<ChangeBatch>,
	saved: Emitter<()>,
	destroyed: Emitter<()>,
}

/// In-memory document handle driven explicitly by tests.
#[derive(Clone)]
pub(crate) struct TestDocument {
	inner: Rc<TestDocumentInner>,
}

impl TestDocument {
	pub(crate) fn new(id: u64, path: Option<&str>, grammar: &str, text: &str) -> Self {
		Self {
			inner: Rc::new(TestDocumentInner {
				id: DocumentId(id),
				text: RefCell::new(text.to_string()),
				path: RefCell::new(path.map(PathBuf::from)),
				grammar: grammar.to_string(),
				changed: Emitter::new(),
				saved: Emitter::new(),
				destroyed: Emitter::new(),
			}),
		}
	}

	pub(crate) fn located(id: u64, path: &str, text: &str) -> Self {
		Self::new(id, Some(path), "Plain Text", text)
	}

	pub(crate) fn unlocated(id: u64, text: &str) -> Self {
		Self::new(id, None, "Plain Text", text)
	}

	/// The URI the sync core derives for this document's current path.
	pub(crate) fn expected_uri(&self) -> Uri {
		let path = self.inner.path.borrow().clone().expect("document has a path");
		uri_from_path(&path).expect("path converts to a URI")
	}

	pub(crate) fn set_path(&self, path: &str) {
		*self.inner.path.borrow_mut() = Some(PathBuf::from(path));
	}

	/// Replace the text and fire one change batch.
	pub(crate) fn change(&self, text: &str, edits: Vec<TextEdit>) -> Result<()> {
		*self.inner.text.borrow_mut() = text.to_string();
		self.inner.changed.emit(&ChangeBatch::new(edits))
	}

	pub(crate) fn save(&self) -> Result<()> {
		self.inner.saved.emit(&())
	}

	pub(crate) fn destroy(&self) -> Result<()> {
		self.inner.destroyed.emit(&())
	}

	pub(crate) fn listener_count(&self) -> usize {
		self.inner.changed.listener_count() + self.inner.saved.listener_count() + self.inner.destroyed.listener_count()
	}
}

impl DocumentHandle for TestDocument {
	fn id(&self) -> DocumentId {
		self.inner.id
	}

	fn text(&self) -> String {
		self.inner.text.borrow().clone()
	}

	fn path(&self) -> Option<PathBuf> {
		self.inner.path.borrow().clone()
	}

	fn grammar(&self) -> String {
		self.inner.grammar.clone()
	}

	fn on_did_change(&self, listener: Listener<ChangeBatch>) -> Subscription {
		self.inner.changed.subscribe(listener)
	}

	fn on_did_save(&self, listener: Listener<()>) -> Subscription {
		self.inner.saved.subscribe(listener)
	}

	fn on_did_destroy(&self, listener: Listener<()>) -> Subscription {
		self.inner.destroyed.subscribe(listener)
	}
}

/// Host with a list of live documents and a creation stream.
#[derive(Default)]
pub(crate) struct TestHost {
	documents: RefCell<Vec<TestDocument>>,
	created: Emitter<TestDocument>,
}

impl TestHost {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Register a document without announcing it.
	pub(crate) fn preload(&self, document: TestDocument) {
		self.documents.borrow_mut().push(document);
	}

	/// Register a document and announce it to observers.
	pub(crate) fn open(&self, document: TestDocument) -> Result<()> {
		self.documents.borrow_mut().push(document.clone());
		self.created.emit(&document)
	}

	/// Announce an already registered document again.
	pub(crate) fn announce(&self, document: &TestDocument) -> Result<()> {
		self.created.emit(document)
	}

	pub(crate) fn observer_count(&self) -> usize {
		self.created.listener_count()
	}
}

impl DocumentHost for TestHost {
	type Handle = TestDocument;

	fn observe_documents(&self, mut listener: Listener<TestDocument>) -> Result<Subscription> {
		let existing = self.documents.borrow().clone();
		for document in &existing {
			listener(document)?;
		}
		Ok(self.created.subscribe(listener))
	}
}

/// A single-line replacement edit.
pub(crate) fn line_edit(row: u32, start: u32, end: u32, old_text: &str, new_text: &str) -> TextEdit {
	TextEdit::new(
		TextRange::new(TextPoint::new(row, start), TextPoint::new(row, end)),
		old_text,
		new_text,
	)
}
