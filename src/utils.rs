#[cfg(target_family = "unix")]
use std::{
    fs::File,
    io::{ErrorKind, Read, Result, Write},
    os::fd::FromRawFd,
};

#[cfg(target_family = "unix")]
pub(crate) fn libc_close_log_on_error(fd: libc::c_int) {
    if fd >= 0 && unsafe { libc::close(fd) } < 0 {
        log::warn!(
            "libc::close({}) failed: {:?}",
            fd,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(target_family = "windows")]
pub(crate) fn windows_close_handle_log_on_error(handle: windows_sys::Win32::Foundation::HANDLE) {
    if handle != windows_sys::Win32::Foundation::INVALID_HANDLE_VALUE
        && !handle.is_null()
        && unsafe { windows_sys::Win32::Foundation::CloseHandle(handle) } == 0
    {
        log::warn!(
            "windows::CloseHandle({:?}) failed: {:?}",
            handle,
            std::io::Error::last_os_error()
        );
    }
}

/// Writes the whole of `buf` to a non-blocking `fd`.
///
/// `WouldBlock` is returned as is when nothing could be written.
#[cfg(target_family = "unix")]
pub(crate) fn libc_write_all(fd: libc::c_int, buf: &[u8]) -> Result<()> {
    let mut file = std::mem::ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    let mut done = 0;
    let todo = buf.len();
    while done < todo {
        match file.write(&buf[done..]) {
            Ok(n) => {
                done += n;
            }
            Err(e) => match e.kind() {
                ErrorKind::Interrupted => {}
                _ => {
                    return Err(e);
                }
            },
        }
    }
    Ok(())
}

/// Reads a non-blocking `fd` until it would block, returning the number of
/// bytes discarded.
#[cfg(target_family = "unix")]
pub(crate) fn libc_drain(fd: libc::c_int) -> Result<usize> {
    let mut file = std::mem::ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });
    let mut buffer = [0u8; 64];
    let mut done = 0;
    loop {
        match file.read(&mut buffer) {
            Ok(0) => {
                return Ok(done);
            }
            Ok(n) => {
                done += n;
            }
            Err(e) => match e.kind() {
                ErrorKind::WouldBlock => {
                    return Ok(done);
                }
                ErrorKind::Interrupted => {}
                _ => {
                    return Err(e);
                }
            },
        }
    }
}

/// Sets `flag` in the fcntl flag word read with `get`, or clears it.
#[cfg(all(
    target_family = "unix",
    not(target_os = "linux"),
    any(test, not(target_os = "freebsd"))
))]
fn libc_fcntl_set(
    fd: libc::c_int,
    get: libc::c_int,
    set: libc::c_int,
    flag: libc::c_int,
    on: bool,
) -> Result<()> {
    let current = unsafe { libc::fcntl(fd, get) };
    if current < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let wanted = if on { current | flag } else { current & !flag };
    if wanted != current && unsafe { libc::fcntl(fd, set, wanted) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Opens a pipe, returning `(read_end, write_end)`.
///
/// Wake events use one where eventfd is missing; tests use them as sessions.
#[cfg(all(
    target_family = "unix",
    any(test, not(any(target_os = "linux", target_os = "freebsd")))
))]
pub(crate) fn libc_pipe2(
    non_blocking: bool,
    close_on_exec: bool,
) -> Result<(libc::c_int, libc::c_int)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    #[cfg(target_os = "linux")]
    {
        let mut flags = 0;
        if non_blocking {
            flags |= libc::O_NONBLOCK;
        }
        if close_on_exec {
            flags |= libc::O_CLOEXEC;
        }
        if unsafe { libc::pipe2(fds.as_mut_ptr(), flags) } < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let configured = fds.iter().try_for_each(|fd| {
            libc_fcntl_set(*fd, libc::F_GETFL, libc::F_SETFL, libc::O_NONBLOCK, non_blocking)?;
            libc_fcntl_set(*fd, libc::F_GETFD, libc::F_SETFD, libc::FD_CLOEXEC, close_on_exec)
        });
        if let Err(err) = configured {
            libc_close_log_on_error(fds[0]);
            libc_close_log_on_error(fds[1]);
            return Err(err);
        }
    }
    Ok((fds[0], fds[1]))
}
