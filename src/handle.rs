#[cfg(not(target_os = "windows"))]
use std::os::fd::RawFd as Inner;
// A `HANDLE` is a pointer; keep its address so the handle stays `Send`.
#[cfg(target_os = "windows")]
type Inner = usize;

/// Native waitable token of a capture session.
///
/// A file descriptor on Unix, an event `HANDLE` on Windows. Two handles are
/// equal when they name the same native object.
#[derive(Copy, PartialEq, Eq, Clone, PartialOrd, Ord, Hash)]
pub struct WaitableHandle {
    pub(crate) inner: Inner,
}

impl WaitableHandle {
    pub fn new(raw: Inner) -> Self {
        Self { inner: raw }
    }
    pub fn invalid() -> Self {
        if cfg!(windows) {
            // INVALID_HANDLE_VALUE
            Self { inner: -1isize as Inner }
        } else {
            Self { inner: -1i32 as Inner }
        }
    }
    pub fn is_valid(&self) -> bool {
        if cfg!(windows) {
            self.inner != (-1isize as Inner) && self.inner != (0 as Inner)
        } else {
            self.inner >= (0 as Inner)
        }
    }
    #[inline]
    pub fn as_raw(&self) -> Inner {
        self.inner
    }
}

#[cfg(target_os = "windows")]
impl WaitableHandle {
    pub fn from_native(handle: windows_sys::Win32::Foundation::HANDLE) -> Self {
        Self {
            inner: handle as usize,
        }
    }
    #[inline]
    pub fn as_native(&self) -> windows_sys::Win32::Foundation::HANDLE {
        self.inner as windows_sys::Win32::Foundation::HANDLE
    }
}

#[cfg(not(target_os = "windows"))]
impl<T: std::os::fd::AsRawFd> From<&T> for WaitableHandle {
    fn from(fd: &T) -> Self {
        Self::new(fd.as_raw_fd())
    }
}

impl std::fmt::Debug for WaitableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if cfg!(windows) {
            f.write_fmt(format_args!("WaitableHandle({:#x})", self.inner))
        } else {
            f.write_fmt(format_args!("WaitableHandle({})", self.inner))
        }
    }
}
