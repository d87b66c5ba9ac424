use std::io::ErrorKind;

use crate::{Timeout, WaitableHandle};

/// Failures reported by a [`Selector`](crate::Selector).
#[derive(Debug)]
pub enum Error {
    /// The wait deadline passed with no session ready.
    Timeout(Timeout),
    /// The session could not yield a waitable handle (e.g. it is closed).
    Handle(std::io::Error),
    /// Another live session is already registered under the same native handle.
    HandleInUse(WaitableHandle),
    /// The wait primitive cannot watch more handles.
    Capacity { limit: usize },
    /// The selector was closed.
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Timeout(timeout) => write!(f, "Timeout: {}.", timeout),
            Error::Handle(err) => write!(f, "Unable to obtain a waitable handle: {}", err),
            Error::HandleInUse(handle) => write!(f, "{:?} is already registered", handle),
            Error::Capacity { limit } => write!(f, "Selector is full ({} handles)", limit),
            Error::Closed => f.write_str("Selector is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Handle(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Timeout(_) => ErrorKind::TimedOut,
            Error::Handle(inner) => inner.kind(),
            Error::HandleInUse(_) => ErrorKind::AlreadyExists,
            Error::Capacity { .. } => ErrorKind::StorageFull,
            Error::Closed => ErrorKind::NotConnected,
        };
        std::io::Error::new(kind, err)
    }
}
