use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::clock::scope::Interception;

/// Animation callback; receives the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64) + Send>;

/// A "current time in milliseconds" source.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> f64;
}

/// Registers callbacks to run before the host's next tick.
pub trait FrameRequester: Send + Sync {
    /// Queue `callback` for the next tick.
    fn request_frame(&self, callback: FrameCallback);
}

/// Monotonic wall clock measured from construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Time source that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Mutex<f64>,
}

impl ManualClock {
    /// Create a clock reading `now_ms`.
    pub fn new(now_ms: f64) -> Self {
        Self {
            now_ms: Mutex::new(now_ms),
        }
    }

    /// Set the current reading.
    pub fn set(&self, now_ms: f64) {
        *self.now_ms.lock() = now_ms;
    }

    /// Move the reading forward by `delta_ms`.
    pub fn advance(&self, delta_ms: f64) {
        *self.now_ms.lock() += delta_ms;
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now_ms.lock()
    }
}

/// Host-side callback registry fired once per display tick.
#[derive(Default)]
pub struct FrameQueue {
    pending: Mutex<VecDeque<FrameCallback>>,
}

impl FrameQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run every callback queued before this call with `now_ms`.
    ///
    /// Callbacks registered while firing wait for the next call.
    pub fn fire(&self, now_ms: f64) -> usize {
        let batch = std::mem::take(&mut *self.pending.lock());
        let n = batch.len();
        for cb in batch {
            cb(now_ms);
        }
        n
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

impl FrameRequester for FrameQueue {
    fn request_frame(&self, callback: FrameCallback) {
        self.pending.lock().push_back(callback);
    }
}

/// Process-wide handle to the host's time and animation-callback primitives.
///
/// Everything in the host that needs "now" or wants a callback before the next tick goes through
/// a clone of this handle. While a [`crate::clock::scope::ClockScope`] is armed both primitives are
/// redirected to the scope's virtual clock and pending queue.
#[derive(Clone)]
pub struct HostClock {
    pub(crate) inner: Arc<HostClockInner>,
}

pub(crate) struct HostClockInner {
    time: Arc<dyn TimeSource>,
    requester: Arc<dyn FrameRequester>,
    pub(crate) interception: Mutex<Option<Arc<Interception>>>,
}

impl HostClock {
    /// Wrap the host's original primitives.
    pub fn new(time: Arc<dyn TimeSource>, requester: Arc<dyn FrameRequester>) -> Self {
        Self {
            inner: Arc::new(HostClockInner {
                time,
                requester,
                interception: Mutex::new(None),
            }),
        }
    }

    /// Current time: virtual while intercepted, otherwise the original source.
    pub fn now(&self) -> f64 {
        match self.active() {
            Some(i) => i.now(),
            None => self.inner.time.now_ms(),
        }
    }

    /// Register an animation callback for the next tick.
    pub fn request_frame(&self, callback: FrameCallback) {
        match self.active() {
            Some(i) => i.enqueue(callback),
            None => self.inner.requester.request_frame(callback),
        }
    }

    /// The original time source, bypassing any interception.
    pub fn real_now(&self) -> f64 {
        self.inner.time.now_ms()
    }

    /// Return `true` while a scope holds the interception.
    pub fn is_intercepted(&self) -> bool {
        self.inner.interception.lock().is_some()
    }

    /// The original time source.
    pub fn time_source(&self) -> &Arc<dyn TimeSource> {
        &self.inner.time
    }

    /// The original callback registrar.
    pub fn frame_requester(&self) -> &Arc<dyn FrameRequester> {
        &self.inner.requester
    }

    fn active(&self) -> Option<Arc<Interception>> {
        self.inner.interception.lock().clone()
    }
}

impl std::fmt::Debug for HostClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostClock")
            .field("intercepted", &self.is_intercepted())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clock/host.rs"]
mod tests;
