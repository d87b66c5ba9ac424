mod event;
pub use event::*;

mod wait_multiple;
pub use wait_multiple::*;

/// Wait primitive used by [`Selector::new`](crate::Selector::new).
pub type DefaultWait = MultipleObjectsWait;
