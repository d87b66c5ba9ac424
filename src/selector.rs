use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use crate::registry::{Lookup, Registry};
use crate::selectable::Canceller;
use crate::wait::WaitEngine;
use crate::{
    sys, Error, Result, Selectable, SelectorRef, Timeout, WaitPrimitive, WaitableHandle,
};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Selector parameters
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct SelectorConfig {
    /// Number of registrations to reserve room for
    pub initial_capacity: u32,
    /// Upper bound on registrations, further capped by the wait primitive
    pub max_handles_hint: u32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            max_handles_hint: u32::MAX,
        }
    }
}

/// A multiplexor of [`Selectable`] capture sessions.
///
/// Sessions are registered with [`register`](Selector::register) and watched by
/// [`select`](Selector::select), which blocks until one of them is ready for
/// I/O or the timeout elapses. A session must be cancelled from its close path
/// (see [`SelectorRef`]) before its native handle is released.
///
/// `Selector` is a cheap handle: clones share the same registrations.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use pcap_select::*;
/// # fn run<S: Selectable + 'static>(live1: Arc<S>, live2: Arc<S>) -> std::result::Result<(), Box<dyn std::error::Error>> {
/// let selector = Selector::new()?;
/// selector.register(&live1)?.register(&live2)?;
/// match selector.select(Timeout::from_millis(10)) {
///     Ok(ready) => {
///         for session in ready {
///             // dispatch packets from `session`
///             # let _ = session;
///         }
///     }
///     Err(Error::Timeout(_)) => {}
///     Err(err) => return Err(err.into()),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Selector<S, P = sys::DefaultWait> {
    inner: Arc<Inner<S, P>>,
}

struct Inner<S, P> {
    id: usize,
    engine: WaitEngine<P>,
    /// Appended after the registered handles so mutators can interrupt a wait
    waker: sys::Event,
    max_handles: usize,
    /// Queues concurrent selects without holding `state`
    selecting: Mutex<()>, // Locked first
    state: Mutex<State<S>>, // Locked second
    /// Held by the selecting thread for the whole wait
    waiting: Mutex<()>, // Locked last
}

struct State<S> {
    registry: Registry<S>,
    closed: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Selectable + 'static> Selector<S> {
    /// Creates a selector using the platform wait primitive.
    pub fn new() -> std::io::Result<Self> {
        Self::with_config(&SelectorConfig::default())
    }

    pub fn with_config(config: &SelectorConfig) -> std::io::Result<Self> {
        Self::with_primitive(config, sys::DefaultWait::default())
    }
}

impl<S, P> Selector<S, P>
where
    S: Selectable + 'static,
    P: WaitPrimitive + 'static,
{
    pub fn with_primitive(config: &SelectorConfig, primitive: P) -> std::io::Result<Self> {
        // One slot is taken by the waker
        let max_handles = num::clamp(
            config.max_handles_hint as usize,
            1,
            primitive.max_handles().saturating_sub(1).max(1),
        );
        let initial_capacity = std::cmp::min(config.initial_capacity as usize, max_handles);
        let inner = Inner {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed) + 1,
            waker: sys::Event::new()?,
            max_handles,
            state: Mutex::new(State {
                registry: Registry::try_new(initial_capacity)?,
                closed: false,
            }),
            selecting: Mutex::new(()),
            waiting: Mutex::new(()),
            engine: WaitEngine::new(primitive),
        };
        log::debug!(
            "selector#{}: created ({}, up to {} handles)",
            inner.id,
            inner.engine.primitive().name(),
            max_handles
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Registers `session`, returning `self` for chaining.
    ///
    /// Registering a session equal to one already registered does nothing. A
    /// session registered with another selector is moved: it is cancelled
    /// there. Fails when the session cannot yield its handle, when its handle
    /// belongs to another registered session, when the wait primitive is full,
    /// or once the selector is closed.
    pub fn register(&self, session: &Arc<S>) -> Result<&Self> {
        let mut state = lock(&self.inner.state);
        if state.closed {
            return Err(Error::Closed);
        }
        if let Some(handle) = state.registry.find(session) {
            log::trace!("selector#{}: {:?} already registered", self.inner.id, handle);
            return Ok(self);
        }
        let handle = session.waitable_handle().map_err(Error::Handle)?;
        state
            .registry
            .insert(handle, session, self.inner.max_handles)?;
        let slot = session.owner_slot();
        slot.attach(self.owner());
        // A close that ran before `attach` found no owner to cancel
        if let Err(err) = session.waitable_handle() {
            state.registry.remove(handle);
            drop(state);
            slot.settle(handle);
            log::debug!(
                "selector#{}: {:?} closed while registering",
                self.inner.id,
                handle
            );
            return Err(Error::Handle(err));
        }
        let registered = state.registry.len();
        drop(state);

        slot.settle(handle);
        log::debug!(
            "selector#{}: registered {:?} ({} handles)",
            self.inner.id,
            handle,
            registered
        );
        Ok(self)
    }

    /// Blocks until a registered session is ready, or `timeout` elapses.
    ///
    /// Returns at most one session. An empty result means nothing was
    /// selected: no registrations, the selector is closed, the ready session
    /// was cancelled or dropped meanwhile, or the wait was interrupted by a
    /// cancellation. Only an elapsed timeout is an error.
    ///
    /// Concurrent calls on clones run one after the other.
    pub fn select(&self, timeout: Timeout) -> Result<Vec<Arc<S>>> {
        let _selecting = lock(&self.inner.selecting);
        let state = lock(&self.inner.state);
        if state.closed || state.registry.is_empty() {
            return Ok(Vec::new());
        }
        let waiting = lock(&self.inner.waiting);
        // Mutators can only notify after the state lock is released
        if let Err(err) = self.inner.waker.drain() {
            log::warn!("selector#{}: waker drain failed: {:?}", self.inner.id, err);
        }
        let registered = state.registry.len();
        let mut snapshot: Vec<WaitableHandle> = Vec::with_capacity(registered + 1);
        snapshot.extend_from_slice(state.registry.handles());
        snapshot.push(self.inner.waker.waitable_handle());
        drop(state);

        let selected = self.inner.engine.wait(&snapshot, registered, timeout);
        drop(waiting);

        let index = match selected? {
            Some(index) => index,
            None => return Ok(Vec::new()),
        };
        let handle = snapshot[index];
        let mut state = lock(&self.inner.state);
        match state.registry.lookup(handle) {
            Lookup::Live(session) => Ok(vec![session]),
            Lookup::Dead => {
                // Dropped without closing: its handle would stay ready forever
                state.registry.remove(handle);
                log::debug!(
                    "selector#{}: pruned {:?} of a dropped session",
                    self.inner.id,
                    handle
                );
                Ok(Vec::new())
            }
            Lookup::Missing => {
                log::trace!(
                    "selector#{}: {:?} was cancelled during the wait",
                    self.inner.id,
                    handle
                );
                Ok(Vec::new())
            }
        }
    }

    /// Removes `session`; a no-op if it is not registered.
    ///
    /// Interrupts an in-progress [`select`](Selector::select) and waits for it
    /// to leave the wait primitive, so the session may release its handle once
    /// this returns.
    pub fn cancel(&self, session: &S) -> bool {
        let handle = match session.waitable_handle() {
            Ok(handle) => Some(handle),
            Err(_) => lock(&self.inner.state).registry.find(session),
        };
        match handle {
            Some(handle) => self.inner.cancel_handle(handle),
            None => false,
        }
    }

    /// Drops every registration; later [`register`](Selector::register) calls
    /// fail with [`Error::Closed`].
    pub fn close(&self) {
        let mut state = lock(&self.inner.state);
        if state.closed {
            return;
        }
        state.closed = true;
        state.registry.clear();
        drop(self.inner.grab_wait_lock_from_mutator());
        log::debug!("selector#{}: closed", self.inner.id);
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner.state).closed
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        lock(&self.inner.state).registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_registered(&self, session: &S) -> bool {
        lock(&self.inner.state).registry.contains(session)
    }

    /// Registered handles, in wait order.
    pub fn handles(&self) -> Vec<WaitableHandle> {
        lock(&self.inner.state).registry.handles().to_vec()
    }

    fn owner(&self) -> SelectorRef {
        let inner: Weak<dyn Canceller> = Arc::downgrade(&self.inner) as Weak<dyn Canceller>;
        SelectorRef::new(self.inner.id, inner)
    }
}

impl<S, P> Inner<S, P> {
    /// Locks `waiting`, waking the selecting thread if it holds it.
    fn grab_wait_lock_from_mutator(&self) -> MutexGuard<'_, ()> {
        match self.waiting.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                // There is a thread running select, wake it, it releases the lock on return
                if let Err(err) = self.waker.notify() {
                    log::warn!("selector#{}: waker notify failed: {:?}", self.id, err);
                }
                lock(&self.waiting)
            }
        }
    }
}

impl<S, P> Canceller for Inner<S, P>
where
    S: Selectable,
    P: WaitPrimitive,
{
    fn cancel_handle(&self, handle: WaitableHandle) -> bool {
        let mut state = lock(&self.state);
        if !state.registry.remove(handle) {
            log::trace!("selector#{}: {:?} is not registered", self.id, handle);
            return false;
        }
        drop(self.grab_wait_lock_from_mutator());
        log::debug!(
            "selector#{}: cancelled {:?} ({} handles)",
            self.id,
            handle,
            state.registry.len()
        );
        true
    }
}

impl<S, P> Clone for Selector<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, P> std::fmt::Debug for Selector<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("id", &self.inner.id)
            .field("max_handles", &self.inner.max_handles)
            .finish()
    }
}
