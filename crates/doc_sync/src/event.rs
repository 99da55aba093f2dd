//! Single-threaded event sources and the subscriptions that detach from them.
//!
//! Hosts use [`Emitter`] to implement the event side of
//! [`DocumentHandle`](crate::DocumentHandle) and [`DocumentHost`](crate::DocumentHost).
//! Every subscribe call hands back a [`Subscription`]; disposing it (or dropping it) is the
//! only way a listener leaves the emitter.
//!
//! Emission rules:
//!
//! * listeners run in subscription order;
//! * a listener unsubscribed by an earlier listener in the same emission is not called;
//! * a listener that is already running is not re-entered;
//! * every live listener is called even if one fails, and the first error is returned.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use slab::Slab;

use crate::Result;

/// Callback invoked with each emitted event.
pub type Listener<E> = Box<dyn FnMut(&E) -> Result<()>>;

type Slot<E> = Rc<RefCell<Listener<E>>>;

/// A synchronous event source.
pub struct Emitter<E> {
	slots: Rc<RefCell<Slab<Slot<E>>>>,
}

impl<E: 'static> Emitter<E> {
	/// Create an emitter with no listeners.
	pub fn new() -> Self {
		Self {
			slots: Rc::new(RefCell::new(Slab::new())),
		}
	}

	/// Register a listener. It stays registered until the returned subscription is disposed.
	pub fn subscribe(&self, listener: Listener<E>) -> Subscription {
		let slot: Slot<E> = Rc::new(RefCell::new(listener));
		let key = self.slots.borrow_mut().insert(slot.clone());

		let slots = Rc::downgrade(&self.slots);
		let slot = Rc::downgrade(&slot);
		Subscription::new(move || {
			let Some(slots) = slots.upgrade() else {
				return;
			};
			let mut slots = slots.borrow_mut();
			// The key may have been reused after an earlier removal.
			if !slots.get(key).is_some_and(|current| Rc::as_ptr(current) == Weak::as_ptr(&slot)) {
				return;
			}
			// The listener may own subscriptions to this emitter; drop it after the borrow ends.
			let removed = slots.remove(key);
			drop(slots);
			drop(removed);
		})
	}

	/// Deliver `event` to every live listener.
	pub fn emit(&self, event: &E) -> Result<()> {
		let snapshot: Vec<(usize, Slot<E>)> = self.slots.borrow().iter().map(|(key, slot)| (key, slot.clone())).collect();

		let mut result = Ok(());
		for (key, slot) in snapshot {
			let live = self.slots.borrow().get(key).is_some_and(|current| Rc::ptr_eq(current, &slot));
			if !live {
				continue;
			}
			let Ok(mut listener) = slot.try_borrow_mut() else {
				tracing::trace!(key, "skipping re-entrant listener");
				continue;
			};
			if let Err(e) = (&mut **listener)(event)
				&& result.is_ok()
			{
				result = Err(e);
			}
		}
		result
	}

	/// Number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.slots.borrow().len()
	}
}

impl<E: 'static> Default for Emitter<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E> fmt::Debug for Emitter<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Emitter").field("listeners", &self.slots.borrow().len()).finish()
	}
}

/// Detaches a listener from its event source.
///
/// Disposal is idempotent. Dropping an undisposed subscription disposes it.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
	unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	/// Wrap an unsubscribe action.
	pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
		Self {
			unsubscribe: Some(Box::new(unsubscribe)),
		}
	}

	/// A subscription with nothing to detach.
	pub fn empty() -> Self {
		Self { unsubscribe: None }
	}

	/// Detach the listener. Does nothing the second time.
	pub fn dispose(&mut self) {
		if let Some(unsubscribe) = self.unsubscribe.take() {
			unsubscribe();
		}
	}

	/// Whether [`dispose`](Self::dispose) has already run.
	pub fn is_disposed(&self) -> bool {
		self.unsubscribe.is_none()
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("disposed", &self.is_disposed()).finish()
	}
}

/// A group of subscriptions disposed together, in the order they were added.
#[derive(Debug, Default)]
pub struct CompositeSubscription {
	subscriptions: Vec<Subscription>,
	disposed: bool,
}

impl CompositeSubscription {
	/// Create an empty group.
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a subscription. Once the group is disposed, added subscriptions are disposed at once.
	pub fn add(&mut self, mut subscription: Subscription) {
		if self.disposed {
			subscription.dispose();
		} else {
			self.subscriptions.push(subscription);
		}
	}

	/// Dispose every subscription in the group.
	pub fn dispose(&mut self) {
		self.disposed = true;
		for mut subscription in self.subscriptions.drain(..) {
			subscription.dispose();
		}
	}

	/// Whether the group has been disposed.
	pub fn is_disposed(&self) -> bool {
		self.disposed
	}

	/// Number of held subscriptions.
	pub fn len(&self) -> usize {
		self.subscriptions.len()
	}

	/// Whether the group holds no subscriptions.
	pub fn is_empty(&self) -> bool {
		self.subscriptions.is_empty()
	}
}
