//! Host time source and animation-callback interception.
//!
//! [`HostClock`] is the shared handle a render loop uses for "now" and for scheduling its next
//! tick. A [`ClockScope`] temporarily replaces both with a virtual clock so a slow capture does not
//! desynchronize animation from the recorded timeline.

/// Host primitives and stock implementations.
pub mod host;
/// Scoped virtual-clock interception.
pub mod scope;

pub use host::{
    FrameCallback, FrameQueue, FrameRequester, HostClock, ManualClock, MonotonicClock, TimeSource,
};
pub use scope::ClockScope;
