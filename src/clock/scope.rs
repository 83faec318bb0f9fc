use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::host::{FrameCallback, HostClock};
use crate::foundation::error::{FramecapError, FramecapResult};

/// Virtual time plus the callbacks registered during the current virtual tick.
pub(crate) struct Interception {
    virtual_ms: Mutex<f64>,
    queue: Mutex<VecDeque<FrameCallback>>,
}

impl Interception {
    pub(crate) fn now(&self) -> f64 {
        *self.virtual_ms.lock()
    }

    pub(crate) fn enqueue(&self, callback: FrameCallback) {
        self.queue.lock().push_back(callback);
    }
}

/// Exclusive ownership of a [`HostClock`]'s interception.
///
/// While alive, the host observes the scope's virtual time and its animation callbacks are held
/// in a FIFO queue until [`ClockScope::drain`]. Dropping the scope restores the original
/// primitives.
pub struct ClockScope {
    host: HostClock,
    state: Arc<Interception>,
}

impl ClockScope {
    /// Install interception on `host`, starting virtual time at `start_ms`.
    ///
    /// Fails if another scope already holds the host.
    pub fn arm(host: &HostClock, start_ms: f64) -> FramecapResult<Self> {
        if !start_ms.is_finite() {
            return Err(FramecapError::validation("virtual start time must be finite"));
        }
        let mut slot = host.inner.interception.lock();
        if slot.is_some() {
            return Err(FramecapError::session(
                "host clock is already intercepted by another recording",
            ));
        }
        let state = Arc::new(Interception {
            virtual_ms: Mutex::new(start_ms),
            queue: Mutex::new(VecDeque::new()),
        });
        *slot = Some(Arc::clone(&state));
        drop(slot);

        tracing::debug!(start_ms, "clock interception armed");
        Ok(Self {
            host: host.clone(),
            state,
        })
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> f64 {
        self.state.now()
    }

    /// Move virtual time forward by `delta_ms` and return the new value.
    pub fn advance(&self, delta_ms: f64) -> f64 {
        let mut t = self.state.virtual_ms.lock();
        *t += delta_ms;
        *t
    }

    /// Callbacks waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.state.queue.lock().len()
    }

    /// Invoke every queued callback in registration order with the committed virtual time.
    ///
    /// Callbacks registered while draining are kept for the next drain.
    pub fn drain(&self) -> usize {
        let batch = std::mem::take(&mut *self.state.queue.lock());
        let now = self.now();
        let n = batch.len();
        for cb in batch {
            cb(now);
        }
        n
    }

    /// The host this scope intercepts.
    pub fn host(&self) -> &HostClock {
        &self.host
    }
}

impl Drop for ClockScope {
    fn drop(&mut self) {
        let mut slot = self.host.inner.interception.lock();
        if slot
            .as_ref()
            .is_some_and(|cur| Arc::ptr_eq(cur, &self.state))
        {
            *slot = None;
        }
        drop(slot);

        // Callbacks still queued belong to the host loop; hand them to the real registrar so the
        // loop keeps running on wall time.
        let leftover = std::mem::take(&mut *self.state.queue.lock());
        if !leftover.is_empty() {
            tracing::debug!(
                callbacks = leftover.len(),
                "returning queued callbacks to host"
            );
        }
        for cb in leftover {
            self.host.frame_requester().request_frame(cb);
        }
    }
}

impl std::fmt::Debug for ClockScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockScope")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clock/scope.rs"]
mod tests;
