use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use crate::WaitableHandle;

/// A capture session that can be watched by a [`Selector`](crate::Selector).
///
/// Equality is used to detect duplicate registrations. A session belongs to at
/// most one selector at a time: registering it with another selector removes
/// it from the previous one.
///
/// The close path of a session must, in this order, make
/// [`waitable_handle`](Selectable::waitable_handle) fail, call
/// [`OwnerSlot::release`], and only then release its native resource.
pub trait Selectable: PartialEq + Send + Sync {
    /// Returns the native handle the wait primitive watches.
    ///
    /// Must return the same handle for the whole life of the session, and fail
    /// once the session is closed.
    fn waitable_handle(&self) -> std::io::Result<WaitableHandle>;

    /// Cell recording the selector the session is registered with.
    fn owner_slot(&self) -> &OwnerSlot;
}

pub(crate) trait Canceller: Send + Sync {
    fn cancel_handle(&self, handle: WaitableHandle) -> bool;
}

/// Non-owning link from a session back to the selector it is registered with.
///
/// Only routes the close-time cancellation; it never keeps the selector alive.
#[derive(Clone)]
pub struct SelectorRef {
    id: usize,
    inner: Weak<dyn Canceller>,
}

impl SelectorRef {
    pub(crate) fn new(id: usize, inner: Weak<dyn Canceller>) -> Self {
        Self { id, inner }
    }

    /// Id of the owning selector.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns `false` once the selector has been dropped.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Removes `handle` from the owning selector.
    ///
    /// Returns `true` if the handle was registered. When this returns, no wait
    /// of that selector references `handle` anymore.
    pub fn cancel(&self, handle: WaitableHandle) -> bool {
        match self.inner.upgrade() {
            Some(selector) => selector.cancel_handle(handle),
            None => false,
        }
    }
}

impl std::fmt::Debug for SelectorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[derive(Debug, Default)]
struct Owners {
    current: Option<SelectorRef>,
    /// Selectors the session was moved away from, not yet cancelled there
    moved_from: Vec<SelectorRef>,
}

/// Storage for a session's owning selector.
///
/// Sessions embed one and return it from [`Selectable::owner_slot`]; their
/// close path calls [`OwnerSlot::release`].
#[derive(Debug, Default)]
pub struct OwnerSlot {
    owners: Mutex<Owners>,
}

impl OwnerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Owners> {
        self.owners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `owner`; a different live previous owner is kept for
    /// [`settle`](OwnerSlot::settle).
    pub(crate) fn attach(&self, owner: SelectorRef) {
        let mut owners = self.lock();
        let id = owner.id();
        if let Some(previous) = owners.current.replace(owner) {
            if previous.id() != id && previous.is_alive() {
                log::debug!(
                    "session moved from selector#{} to selector#{}",
                    previous.id(),
                    id
                );
                owners.moved_from.push(previous);
            }
        }
    }

    /// Cancels `handle` at the selectors the session was moved away from.
    ///
    /// Must not be called with a selector lock held.
    pub(crate) fn settle(&self, handle: WaitableHandle) -> usize {
        let moved_from = std::mem::take(&mut self.lock().moved_from);
        moved_from
            .iter()
            .filter(|previous| previous.cancel(handle))
            .count()
    }

    pub fn owner(&self) -> Option<SelectorRef> {
        self.lock().current.clone()
    }

    /// Detaches from the owner and cancels `handle` there.
    ///
    /// Returns `true` if the current owner had `handle` registered.
    pub fn release(&self, handle: WaitableHandle) -> bool {
        // The slot lock must not be held while a selector lock is taken
        let (current, moved_from) = {
            let mut owners = self.lock();
            (owners.current.take(), std::mem::take(&mut owners.moved_from))
        };
        for previous in moved_from {
            previous.cancel(handle);
        }
        match current {
            Some(owner) => owner.cancel(handle),
            None => false,
        }
    }
}
