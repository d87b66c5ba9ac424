use std::io::{Error, ErrorKind, Result};
use windows_sys::Win32::Foundation::{HANDLE, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Threading::{
    WaitForMultipleObjects, INFINITE, MAXIMUM_WAIT_OBJECTS,
};

use crate::{WaitPrimitive, WaitStatus, WaitableHandle};

/// `WaitForMultipleObjects` based wait, in "wait for any" mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultipleObjectsWait;

impl MultipleObjectsWait {
    pub fn new() -> Self {
        Self
    }
}

impl WaitPrimitive for MultipleObjectsWait {
    fn name(&self) -> &'static str {
        "WaitForMultipleObjects"
    }

    fn max_handles(&self) -> usize {
        MAXIMUM_WAIT_OBJECTS as usize
    }

    fn wait_any(&self, handles: &[WaitableHandle], timeout_ms: u32) -> Result<WaitStatus> {
        if handles.is_empty() || handles.len() > self.max_handles() {
            return Err(Error::from(ErrorKind::InvalidInput));
        }
        // INFINITE is reserved
        let timeout_ms = num::clamp(timeout_ms, 0, INFINITE - 1);
        let native: Vec<HANDLE> = handles.iter().map(WaitableHandle::as_native).collect();
        let rc = unsafe {
            WaitForMultipleObjects(native.len() as u32, native.as_ptr(), 0, timeout_ms)
        };
        match rc {
            WAIT_TIMEOUT => Ok(WaitStatus::TimedOut),
            WAIT_FAILED => Err(Error::last_os_error()),
            // Abandoned mutexes land past the handle count
            _ => Ok(WaitStatus::Signaled(rc.wrapping_sub(WAIT_OBJECT_0) as usize)),
        }
    }
}
