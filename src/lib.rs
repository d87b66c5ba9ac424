//! Readiness selection over live packet-capture sessions.
//!
//! A [`Selector`] tracks a set of [`Selectable`] sessions and blocks the
//! calling thread until one of them has data ready, or until a [`Timeout`]
//! elapses. The wait itself is delegated to a platform [`WaitPrimitive`]:
//! `poll(2)` on Unix and `WaitForMultipleObjects` on Windows.
mod error;
mod handle;
mod registry;
mod selectable;
mod selector;
mod sys;
mod timeout;
mod utils;
mod wait;

#[cfg(test)]
mod testing;

pub use error::*;
pub use handle::WaitableHandle;
pub use selectable::*;
pub use selector::*;
pub use sys::DefaultWait;
#[cfg(target_family = "windows")]
pub use sys::MultipleObjectsWait;
#[cfg(target_family = "unix")]
pub use sys::PollWait;
pub use timeout::*;
pub use wait::{WaitPrimitive, WaitStatus};

/// Converts `duration` to whole milliseconds, rounding down and saturating at
/// `u32::MAX`.
#[inline]
pub(crate) fn saturating_duration_to_ms(duration: &std::time::Duration) -> u32 {
    num::clamp(duration.as_millis(), 0, u32::MAX as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn duration_to_ms_rounds_down() {
        assert_eq!(saturating_duration_to_ms(&Duration::ZERO), 0);
        assert_eq!(saturating_duration_to_ms(&Duration::from_micros(999)), 0);
        assert_eq!(saturating_duration_to_ms(&Duration::from_micros(1_999)), 1);
        assert_eq!(saturating_duration_to_ms(&Duration::from_secs(3)), 3_000);
    }

    #[test]
    fn duration_to_ms_saturates() {
        assert_eq!(
            saturating_duration_to_ms(&Duration::from_secs(u64::MAX)),
            u32::MAX
        );
    }
}
