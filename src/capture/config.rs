use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::FrameRate;
use crate::foundation::error::{FramecapError, FramecapResult};

/// What a recording does when the frame encoder fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeFailurePolicy {
    /// Stop the session, flush what was captured and report the failure.
    #[default]
    Abort,
    /// Drop the frame and keep going; the frame number is not reused.
    Skip,
}

/// Options for [`crate::capture::scheduler::CaptureScheduler::start`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordingConfig {
    /// Virtual time of the first frame in seconds. `None` records from the host's current time.
    pub start_offset_seconds: Option<f64>,
    /// Recording length in seconds. `None` records until stopped.
    pub duration_seconds: Option<f64>,
    /// Capture frame rate.
    pub frame_rate: f64,
    /// Rotate to a new archive part once the current one reaches this many megabytes (10^6 bytes).
    pub part_size_ceiling_mb: f64,
    /// Base name for emitted parts. `None` derives one from the session start timestamp.
    pub archive_name: Option<String>,
    /// Frame encoder failure handling.
    pub on_encode_failure: EncodeFailurePolicy,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            start_offset_seconds: None,
            duration_seconds: None,
            frame_rate: 30.0,
            part_size_ceiling_mb: 500.0,
            archive_name: None,
            on_encode_failure: EncodeFailurePolicy::Abort,
        }
    }
}

impl RecordingConfig {
    /// Parse a JSON config.
    pub fn from_json_str(s: &str) -> FramecapResult<Self> {
        let cfg: Self = serde_json::from_str(s).context("parse recording config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: &Path) -> FramecapResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read recording config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Check value ranges.
    pub fn validate(&self) -> FramecapResult<()> {
        FrameRate::new(self.frame_rate)?;
        if let Some(d) = self.duration_seconds
            && (!d.is_finite() || d < 0.0)
        {
            return Err(FramecapError::validation(
                "duration_seconds must be finite and >= 0",
            ));
        }
        if let Some(s) = self.start_offset_seconds
            && (!s.is_finite() || s < 0.0)
        {
            return Err(FramecapError::validation(
                "start_offset_seconds must be finite and >= 0",
            ));
        }
        if !self.part_size_ceiling_mb.is_finite() || self.part_size_ceiling_mb <= 0.0 {
            return Err(FramecapError::validation(
                "part_size_ceiling_mb must be finite and > 0",
            ));
        }
        if let Some(name) = &self.archive_name
            && (name.is_empty() || name.contains(['/', '\\', '\0']))
        {
            return Err(FramecapError::validation(
                "archive_name must be a non-empty file name without path separators",
            ));
        }
        Ok(())
    }

    /// Validated frame rate.
    pub fn frame_rate(&self) -> FramecapResult<FrameRate> {
        FrameRate::new(self.frame_rate)
    }

    /// Frames to capture before stopping; `0` means unbounded.
    pub fn frame_limit(&self) -> FramecapResult<u64> {
        let fps = self.frame_rate()?;
        Ok(self
            .duration_seconds
            .map(|d| fps.frames_for_secs_ceil(d))
            .unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/config.rs"]
mod tests;
