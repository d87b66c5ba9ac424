use crate::utils::windows_close_handle_log_on_error;
use crate::WaitableHandle;
use std::io::{Error, Result};
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::System::Threading::{CreateEventA, ResetEvent, SetEvent};

/// A wake-up event: signaled once notified, until a wait consumes it.
///
/// An event starts not-notified.
#[derive(Debug)]
pub struct Event {
    handle: HANDLE,
}

unsafe impl Send for Event {}
unsafe impl Sync for Event {}

impl Drop for Event {
    fn drop(&mut self) {
        windows_close_handle_log_on_error(self.handle);
    }
}

impl Event {
    pub fn new() -> Result<Self> {
        // Auto-reset: a satisfied wait clears it
        let handle = unsafe { CreateEventA(std::ptr::null(), 0, 0, std::ptr::null()) };
        if handle.is_null() {
            Err(Error::last_os_error())
        } else {
            Ok(Self { handle })
        }
    }

    /// Notify a waiter (multiple notification may be coalesced into one)
    pub fn notify(&self) -> Result<()> {
        if unsafe { SetEvent(self.handle) } != 0 {
            Ok(())
        } else {
            Err(Error::last_os_error())
        }
    }

    /// Clears pending notifications.
    pub fn drain(&self) -> Result<()> {
        if unsafe { ResetEvent(self.handle) } != 0 {
            Ok(())
        } else {
            Err(Error::last_os_error())
        }
    }

    #[inline]
    pub fn waitable_handle(&self) -> WaitableHandle {
        WaitableHandle::from_native(self.handle)
    }
}
