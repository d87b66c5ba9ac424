use crate::utils::{libc_close_log_on_error, libc_drain, libc_write_all};
use crate::WaitableHandle;
use std::io::{Error, ErrorKind, Result};

/// A wake-up event: becomes readable once notified, until drained.
///
/// An event starts not-notified.
#[derive(Debug)]
pub struct Event {
    fd: libc::c_int,
}

impl Drop for Event {
    fn drop(&mut self) {
        libc_close_log_on_error(self.fd);
    }
}

impl Event {
    pub fn new() -> Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
        if fd >= 0 {
            Ok(Self { fd })
        } else {
            Err(Error::last_os_error())
        }
    }

    /// Notify a waiter (multiple notification may be coalesced into one)
    pub fn notify(&self) -> Result<()> {
        let unpark_msg = 1u64.to_ne_bytes();
        match libc_write_all(self.fd, &unpark_msg) {
            // Counter saturated: already notified
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(()),
            other => other,
        }
    }

    /// Clears pending notifications.
    pub fn drain(&self) -> Result<()> {
        libc_drain(self.fd).map(|_| ())
    }

    #[inline]
    pub fn waitable_handle(&self) -> WaitableHandle {
        WaitableHandle::new(self.fd)
    }
}
