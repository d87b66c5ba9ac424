use crate::utils::{libc_drain, libc_pipe2, libc_write_all};
use crate::WaitableHandle;
use std::{
    io::{ErrorKind, Result},
    os::fd::{AsRawFd, FromRawFd, OwnedFd},
};

/// A wake-up event: becomes readable once notified, until drained.
///
/// An event starts not-notified.
#[derive(Debug)]
pub struct Event {
    read_end: OwnedFd,
    write_end: OwnedFd,
}

impl Event {
    pub fn new() -> Result<Self> {
        let (read_end, write_end) = libc_pipe2(true, true)?;
        Ok(Self {
            read_end: unsafe { OwnedFd::from_raw_fd(read_end) },
            write_end: unsafe { OwnedFd::from_raw_fd(write_end) },
        })
    }

    /// Notify a waiter (multiple notification may be coalesced into one)
    pub fn notify(&self) -> Result<()> {
        let unpark_msg = 1u8.to_ne_bytes();
        match libc_write_all(self.write_end.as_raw_fd(), &unpark_msg) {
            // Pipe full: already notified
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(()),
            other => other,
        }
    }

    /// Clears pending notifications.
    pub fn drain(&self) -> Result<()> {
        libc_drain(self.read_end.as_raw_fd()).map(|_| ())
    }

    #[inline]
    pub fn waitable_handle(&self) -> WaitableHandle {
        WaitableHandle::from(&self.read_end)
    }
}
