//! Creation and teardown of per-document sessions.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use lsp_types::ServerCapabilities;

use crate::{
	CompositeSubscription, Connection, DocumentHandle, DocumentHost, DocumentId, DocumentSyncSession, LanguageIdMapper,
	Result, Subscription, SyncMode, SyncOptions,
};

/// Predicate deciding whether a document is synchronized at all.
pub type Selector<H> = Box<dyn Fn(&H) -> bool>;

/// Builder for [`SyncCoordinator`].
pub struct SyncCoordinatorBuilder<H: DocumentHandle> {
	connection: Rc<dyn Connection>,
	mode: SyncMode,
	selector: Option<Selector<H>>,
	language_id_mapper: Option<LanguageIdMapper>,
	options: SyncOptions,
}

impl<H: DocumentHandle> SyncCoordinatorBuilder<H> {
	/// Only synchronize handles for which `selector` returns true. Defaults to all handles.
	pub fn selector(mut self, selector: impl Fn(&H) -> bool + 'static) -> Self {
		self.selector = Some(Box::new(selector));
		self
	}

	/// Transform grammar names before they become `languageId`s.
	pub fn language_id_mapper(mut self, mapper: impl Fn(&str) -> String + 'static) -> Self {
		self.language_id_mapper = Some(Rc::new(mapper));
		self
	}

	/// Set session options.
	pub fn options(mut self, options: SyncOptions) -> Self {
		self.options = options;
		self
	}

	/// Build the coordinator. It manages nothing until handles are observed.
	pub fn build(self) -> SyncCoordinator<H> {
		SyncCoordinator {
			inner: Rc::new(CoordinatorInner {
				connection: self.connection,
				mode: self.mode,
				options: self.options,
				language_id_mapper: self.language_id_mapper,
				selector: self.selector.unwrap_or_else(|| Box::new(|_| true)),
				sessions: RefCell::new(HashMap::new()),
				observation: RefCell::new(CompositeSubscription::new()),
				disposed: Cell::new(false),
			}),
		}
	}
}

/// Tracks eligible documents and owns one [`DocumentSyncSession`] for each.
///
/// At most one session exists per [`DocumentId`]. A session is removed exactly when the
/// host reports its handle destroyed; the host must do so before releasing the handle.
/// Dropping the coordinator disposes it.
pub struct SyncCoordinator<H: DocumentHandle> {
	inner: Rc<CoordinatorInner<H>>,
}

struct CoordinatorInner<H: DocumentHandle> {
	connection: Rc<dyn Connection>,
	mode: SyncMode,
	options: SyncOptions,
	language_id_mapper: Option<LanguageIdMapper>,
	selector: Selector<H>,
	sessions: RefCell<HashMap<DocumentId, ManagedSession<H>>>,
	observation: RefCell<CompositeSubscription>,
	disposed: Cell<bool>,
}

struct ManagedSession<H: DocumentHandle> {
	session: DocumentSyncSession<H>,
	_destroy_hook: Subscription,
}

impl<H: DocumentHandle> SyncCoordinator<H> {
	/// Start building a coordinator that sends changes in `mode`.
	///
	/// `mode` should come from [`SyncMode::negotiate`] or an equivalent upstream check.
	pub fn builder(connection: Rc<dyn Connection>, mode: SyncMode) -> SyncCoordinatorBuilder<H> {
		SyncCoordinatorBuilder {
			connection,
			mode,
			selector: None,
			language_id_mapper: None,
			options: SyncOptions::default(),
		}
	}

	/// Whether the server advertises a sync kind a coordinator can work with.
	pub fn can_activate(capabilities: &ServerCapabilities) -> bool {
		SyncMode::can_activate(capabilities)
	}

	/// Follow `host`'s document stream: existing handles now, new ones as they appear.
	pub fn observe_host<D>(&self, host: &D) -> Result<()>
	where
		D: DocumentHost<Handle = H>,
	{
		if self.inner.disposed.get() {
			return Ok(());
		}
		let weak = Rc::downgrade(&self.inner);
		let subscription = host.observe_documents(Box::new(move |handle: &H| match weak.upgrade() {
			Some(inner) => inner.observe(handle.clone()),
			None => Ok(()),
		}))?;
		self.inner.observation.borrow_mut().add(subscription);
		Ok(())
	}

	/// Start synchronizing `handle` unless it is already managed or the selector rejects it.
	///
	/// A newly created session sends `didOpen` right away when the handle has a location.
	pub fn observe(&self, handle: H) -> Result<()> {
		self.inner.observe(handle)
	}

	/// Dispose every session and stop observing. Sends nothing. Idempotent.
	pub fn dispose(&self) {
		self.inner.dispose();
	}

	/// The sync mode shared by every session.
	pub fn mode(&self) -> SyncMode {
		self.inner.mode
	}

	/// Number of managed sessions.
	pub fn len(&self) -> usize {
		self.inner.sessions.borrow().len()
	}

	/// Whether no session is managed.
	pub fn is_empty(&self) -> bool {
		self.inner.sessions.borrow().is_empty()
	}

	/// Whether a session exists for `id`.
	pub fn contains(&self, id: DocumentId) -> bool {
		self.inner.sessions.borrow().contains_key(&id)
	}

	/// The session for `id`, if managed.
	pub fn session(&self, id: DocumentId) -> Option<DocumentSyncSession<H>> {
		self.inner.sessions.borrow().get(&id).map(|managed| managed.session.clone())
	}

	/// Whether [`dispose`](Self::dispose) has run.
	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.get()
	}
}

impl<H: DocumentHandle> Drop for SyncCoordinator<H> {
	fn drop(&mut self) {
		self.inner.dispose();
	}
}

impl<H: DocumentHandle> std::fmt::Debug for SyncCoordinator<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncCoordinator")
			.field("mode", &self.inner.mode)
			.field("sessions", &self.len())
			.field("disposed", &self.is_disposed())
			.finish_non_exhaustive()
	}
}

impl<H: DocumentHandle> CoordinatorInner<H> {
	fn observe(self: &Rc<Self>, handle: H) -> Result<()> {
		if self.disposed.get() {
			return Ok(());
		}
		let id = handle.id();
		if self.sessions.borrow().contains_key(&id) {
			tracing::trace!(id = %id, "document already managed");
			return Ok(());
		}
		if !(self.selector)(&handle) {
			tracing::trace!(id = %id, "document rejected by selector");
			return Ok(());
		}

		let session = DocumentSyncSession::attach(
			handle.clone(),
			self.connection.clone(),
			self.mode,
			self.options,
			self.language_id_mapper.clone(),
		);
		let weak = Rc::downgrade(self);
		let destroy_hook = handle.on_did_destroy(Box::new(move |_| {
			if let Some(inner) = weak.upgrade() {
				inner.forget(id);
			}
			Ok(())
		}));

		// Registered before didOpen so a re-entrant observe of the same handle is a no-op.
		self.sessions.borrow_mut().insert(
			id,
			ManagedSession {
				session: session.clone(),
				_destroy_hook: destroy_hook,
			},
		);
		tracing::debug!(id = %id, mode = ?self.mode, "tracking document");

		session.open().inspect_err(|e| {
			tracing::debug!(id = %id, error = %e, "didOpen failed, dropping session");
			self.forget(id);
		})
	}

	fn forget(&self, id: DocumentId) {
		let managed = self.sessions.borrow_mut().remove(&id);
		if let Some(managed) = managed {
			managed.session.dispose();
			tracing::debug!(id = %id, "stopped tracking document");
		}
	}

	fn dispose(&self) {
		if self.disposed.replace(true) {
			return;
		}
		self.observation.borrow_mut().dispose();

		let sessions: Vec<ManagedSession<H>> = self.sessions.borrow_mut().drain().map(|(_, managed)| managed).collect();
		tracing::debug!(sessions = sessions.len(), "disposing document sync");
		for managed in sessions {
			managed.session.dispose();
		}
	}
}
