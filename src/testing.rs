use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::{OwnerSlot, Selectable, SelectorRef, WaitPrimitive, WaitStatus, WaitableHandle};

/// Wait primitive replaying a fixed list of outcomes, then timing out.
#[derive(Debug)]
pub(crate) struct ScriptedWait {
    script: Mutex<VecDeque<Result<WaitStatus>>>,
    calls: Mutex<Vec<(Vec<WaitableHandle>, u32)>>,
    delay: Duration,
    max_handles: usize,
}

impl ScriptedWait {
    pub(crate) fn new<I: IntoIterator<Item = Result<WaitStatus>>>(script: I) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            max_handles: usize::MAX,
        }
    }
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
    pub(crate) fn with_max_handles(mut self, max_handles: usize) -> Self {
        self.max_handles = max_handles;
        self
    }
    pub(crate) fn push(&self, outcome: Result<WaitStatus>) {
        self.script.lock().unwrap().push_back(outcome);
    }
    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
    pub(crate) fn timeouts(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(_, ms)| *ms).collect()
    }
    pub(crate) fn last_handles(&self) -> Option<Vec<WaitableHandle>> {
        self.calls.lock().unwrap().last().map(|(h, _)| h.clone())
    }
}

impl WaitPrimitive for ScriptedWait {
    fn name(&self) -> &'static str {
        "Scripted"
    }
    fn max_handles(&self) -> usize {
        self.max_handles
    }
    fn wait_any(&self, handles: &[WaitableHandle], timeout_ms: u32) -> Result<WaitStatus> {
        self.calls
            .lock()
            .unwrap()
            .push((handles.to_vec(), timeout_ms));
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(WaitStatus::TimedOut))
    }
}

/// Session with a made-up handle, for scripted waits.
#[derive(Debug)]
pub(crate) struct FakeSession {
    id: u32,
    handle: WaitableHandle,
    closed: AtomicBool,
    owner: OwnerSlot,
}

impl FakeSession {
    pub(crate) fn new(id: u32, raw: i32) -> Self {
        Self {
            id,
            handle: WaitableHandle::new(raw as _),
            closed: AtomicBool::new(false),
            owner: OwnerSlot::new(),
        }
    }
    pub(crate) fn handle(&self) -> WaitableHandle {
        self.handle
    }
    pub(crate) fn owner(&self) -> Option<SelectorRef> {
        self.owner.owner()
    }
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.owner.release(self.handle);
        }
    }
}

impl PartialEq for FakeSession {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Selectable for FakeSession {
    fn waitable_handle(&self) -> Result<WaitableHandle> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::new(ErrorKind::NotConnected, "session is closed"))
        } else {
            Ok(self.handle)
        }
    }
    fn owner_slot(&self) -> &OwnerSlot {
        &self.owner
    }
}

#[cfg(target_family = "unix")]
pub(crate) use pipe_session::PipeSession;

#[cfg(target_family = "unix")]
mod pipe_session {
    use super::*;
    use crate::utils::{libc_pipe2, libc_write_all};
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    /// Session whose readiness is the read end of a pipe.
    #[derive(Debug)]
    pub(crate) struct PipeSession {
        id: u32,
        read_end: WaitableHandle,
        closed: AtomicBool,
        fds: Mutex<Option<(OwnedFd, OwnedFd)>>,
        owner: OwnerSlot,
    }

    impl PipeSession {
        pub(crate) fn new(id: u32) -> Self {
            let (read_end, write_end) = libc_pipe2(true, true).unwrap();
            Self {
                id,
                read_end: WaitableHandle::new(read_end),
                closed: AtomicBool::new(false),
                fds: Mutex::new(Some(unsafe {
                    (OwnedFd::from_raw_fd(read_end), OwnedFd::from_raw_fd(write_end))
                })),
                owner: OwnerSlot::new(),
            }
        }
        /// Makes the session readable.
        pub(crate) fn inject(&self) {
            let fds = self.fds.lock().unwrap();
            let (_, write_end) = fds.as_ref().unwrap();
            libc_write_all(write_end.as_raw_fd(), &[0x2a]).unwrap();
        }
        pub(crate) fn close(&self) {
            if !self.closed.swap(true, Ordering::SeqCst) {
                self.owner.release(self.read_end);
                self.fds.lock().unwrap().take();
            }
        }
    }

    impl PartialEq for PipeSession {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Selectable for PipeSession {
        fn waitable_handle(&self) -> Result<WaitableHandle> {
            if self.closed.load(Ordering::SeqCst) {
                Err(Error::new(ErrorKind::NotConnected, "session is closed"))
            } else {
                Ok(self.read_end)
            }
        }
        fn owner_slot(&self) -> &OwnerSlot {
            &self.owner
        }
    }
}
