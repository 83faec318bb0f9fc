use crate::foundation::error::{FramecapError, FramecapResult};

/// 1-based number of a captured frame, as used in archive entry names.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameNumber(pub u64);

impl FrameNumber {
    /// Archive entry name for this frame: seven zero-padded digits plus the extension.
    pub fn entry_name(self, ext: &str) -> String {
        format!("{:07}.{ext}", self.0)
    }
}

/// Capture frame rate in frames per second.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRate(f64);

impl FrameRate {
    /// Create a validated frame rate (finite and strictly positive).
    pub fn new(fps: f64) -> FramecapResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FramecapError::validation(format!(
                "frame rate must be finite and > 0, got {fps}"
            )));
        }
        Ok(Self(fps))
    }

    /// Frames per second.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Duration of one frame in milliseconds.
    pub fn interval_ms(self) -> f64 {
        1000.0 / self.0
    }

    /// Number of frames needed to cover `secs`, rounding up.
    pub fn frames_for_secs_ceil(self, secs: f64) -> u64 {
        (secs * self.0).ceil().max(0.0) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
