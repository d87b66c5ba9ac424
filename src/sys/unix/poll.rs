use nix::errno::Errno;
use std::io::{Error, ErrorKind, Result};

use crate::{WaitPrimitive, WaitStatus, WaitableHandle};

pub const MAX_POLL_FDS: usize = libc::nfds_t::MAX as _;

bitflags::bitflags! {
    /// Represents a set of input and output flags for poll.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct PollEvent: libc::c_short {
        /// Readable interests or event.
        const IN = libc::POLLIN;
        /// Priority interests or event.
        const PRI = libc::POLLPRI;

        /// Error event.
        const ERR = libc::POLLERR;
        /// Hang-up event (peer closed its end of the channel).
        const HUP = libc::POLLHUP;
        /// The descriptor is not open.
        const NVAL = libc::POLLNVAL;
    }
}

/// `poll(2)` based wait: a handle is ready once it is readable, or in error.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollWait;

impl PollWait {
    pub fn new() -> Self {
        Self
    }
}

impl WaitPrimitive for PollWait {
    fn name(&self) -> &'static str {
        "Poll"
    }

    fn max_handles(&self) -> usize {
        MAX_POLL_FDS
    }

    fn wait_any(&self, handles: &[WaitableHandle], timeout_ms: u32) -> Result<WaitStatus> {
        if handles.len() > MAX_POLL_FDS {
            return Err(Error::from(ErrorKind::InvalidInput));
        }
        let timeout = num::clamp(timeout_ms, 0, libc::c_int::MAX as u32) as libc::c_int;
        // A bug in kernels < 2.6.37 makes timeouts larger than LONG_MAX / CONFIG_HZ
        // (approx. 30 minutes with CONFIG_HZ=1200) effectively infinite on 32 bits
        // architectures. The magic number is the same constant used by libuv.
        #[cfg(all(target_os = "linux", target_pointer_width = "32"))]
        let timeout = std::cmp::min(1789569 as libc::c_int, timeout);

        let mut pfd: Vec<libc::pollfd> = handles
            .iter()
            .map(|handle| libc::pollfd {
                fd: handle.as_raw(),
                events: (PollEvent::IN | PollEvent::PRI).bits(),
                revents: 0,
            })
            .collect();
        let poll_result = unsafe { libc::poll(pfd.as_mut_ptr(), pfd.len() as _, timeout) };
        if poll_result < 0 {
            // EINTR surfaces as `ErrorKind::Interrupted`
            return Err(Error::from(Errno::last()));
        }
        if poll_result == 0 {
            return Ok(WaitStatus::TimedOut);
        }
        // Report the first ready handle, in registration order
        let index = pfd
            .iter()
            .position(|pfd| !PollEvent::from_bits_truncate(pfd.revents).is_empty())
            .unwrap_or(pfd.len());
        Ok(WaitStatus::Signaled(index))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::{libc_close_log_on_error, libc_pipe2, libc_write_all};

    #[test]
    fn test_timeout() {
        let (read_end, write_end) = libc_pipe2(true, true).unwrap();
        let start = std::time::Instant::now();
        let status = PollWait::new()
            .wait_any(&[WaitableHandle::new(read_end)], 10)
            .unwrap();
        assert_eq!(status, WaitStatus::TimedOut);
        assert!(start.elapsed() >= std::time::Duration::from_millis(9));
        libc_close_log_on_error(read_end);
        libc_close_log_on_error(write_end);
    }

    #[test]
    fn test_second_ready() {
        let (r1, w1) = libc_pipe2(true, true).unwrap();
        let (r2, w2) = libc_pipe2(true, true).unwrap();
        libc_write_all(w2, b"x").unwrap();
        let handles = [WaitableHandle::new(r1), WaitableHandle::new(r2)];
        assert_eq!(
            PollWait::new().wait_any(&handles, 1_000).unwrap(),
            WaitStatus::Signaled(1)
        );
        libc_write_all(w1, b"x").unwrap();
        assert_eq!(
            PollWait::new().wait_any(&handles, 1_000).unwrap(),
            WaitStatus::Signaled(0)
        );
        for fd in [r1, w1, r2, w2] {
            libc_close_log_on_error(fd);
        }
    }

    #[test]
    fn test_hang_up_is_ready() {
        let (read_end, write_end) = libc_pipe2(true, true).unwrap();
        libc_close_log_on_error(write_end);
        assert_eq!(
            PollWait::new()
                .wait_any(&[WaitableHandle::new(read_end)], 1_000)
                .unwrap(),
            WaitStatus::Signaled(0)
        );
        libc_close_log_on_error(read_end);
    }
}
