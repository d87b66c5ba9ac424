use std::io::ErrorKind;
use std::time::Instant;

use crate::{saturating_duration_to_ms, Error, Result, Timeout, WaitableHandle};

/// Outcome of a successful call to a platform wait primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Ordinal of the handle that became ready.
    Signaled(usize),
    /// The timeout elapsed with no handle ready.
    TimedOut,
}

/// A blocking "wait for any" over an array of native handles.
pub trait WaitPrimitive: Send + Sync {
    fn name(&self) -> &'static str;

    /// Largest number of handles a single wait accepts.
    fn max_handles(&self) -> usize;

    /// Blocks until one of `handles` is ready or `timeout_ms` elapses.
    ///
    /// A signal interruption must be reported as an error of kind
    /// [`ErrorKind::Interrupted`].
    fn wait_any(&self, handles: &[WaitableHandle], timeout_ms: u32) -> std::io::Result<WaitStatus>;
}

/// Drives a [`WaitPrimitive`]: retries interrupted waits and turns the raw
/// outcome into a ready ordinal.
#[derive(Debug)]
pub(crate) struct WaitEngine<P> {
    primitive: P,
}

impl<P: WaitPrimitive> WaitEngine<P> {
    pub(crate) fn new(primitive: P) -> Self {
        Self { primitive }
    }

    #[inline]
    pub(crate) fn primitive(&self) -> &P {
        &self.primitive
    }

    /// Waits on `handles` and returns the ordinal of the ready handle when it
    /// is below `registered`.
    ///
    /// Handles past `registered` are internal (the wake event); a wake-up from
    /// them, like any failure other than an interruption, yields `Ok(None)`.
    /// Interrupted waits are retried with the time left before the deadline
    /// computed on entry.
    pub(crate) fn wait(
        &self,
        handles: &[WaitableHandle],
        registered: usize,
        timeout: Timeout,
    ) -> Result<Option<usize>> {
        debug_assert!(registered <= handles.len());
        let requested = timeout.as_duration();
        let deadline = Instant::now().checked_add(requested);
        let mut timeout_ms = saturating_duration_to_ms(&requested);
        loop {
            match self.primitive.wait_any(handles, timeout_ms) {
                Ok(WaitStatus::Signaled(index)) if index < registered => {
                    return Ok(Some(index));
                }
                Ok(WaitStatus::Signaled(index)) => {
                    log::trace!(
                        "{}: ordinal {} is not a registered handle ({} registered)",
                        self.primitive.name(),
                        index,
                        registered
                    );
                    return Ok(None);
                }
                Ok(WaitStatus::TimedOut) => {
                    return Err(Error::Timeout(timeout));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    if let Some(deadline) = deadline {
                        timeout_ms = saturating_duration_to_ms(
                            &deadline.saturating_duration_since(Instant::now()),
                        );
                    }
                    log::debug!(
                        "{}: wait interrupted, retrying for {} ms",
                        self.primitive.name(),
                        timeout_ms
                    );
                }
                Err(err) => {
                    log::warn!("{}: wait failed: {:?}", self.primitive.name(), err);
                    return Ok(None);
                }
            }
        }
    }
}
