//! framecap records a real-time render loop frame by frame into deterministic tar archives.
//!
//! Capturing a frame takes an unpredictable amount of time. To keep the recorded animation on a
//! fixed timeline, framecap replaces the host's clock with a virtual one while recording:
//!
//! 1. **Intercept**: a [`ClockScope`] takes over the [`HostClock`] (time source and animation
//!    callback registration).
//! 2. **Capture**: each host tick, [`CaptureScheduler::update`] hands the rendered [`FrameRGBA`] to a
//!    [`FrameEncoder`]; at most one capture is in flight.
//! 3. **Commit**: on completion the bytes are appended to a [`Tarball`], virtual time advances by
//!    exactly one frame interval and the queued callbacks run with the new time.
//! 4. **Export**: archives are emitted as [`ArchivePart`]s through a [`PartSink`], rotating to a new
//!    part when a size ceiling is reached.
//!
//! `unsafe` is forbidden in this crate.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Streaming tape-archive encoder.
pub mod archive;
/// Capture scheduling and export.
pub mod capture;
/// Host clock interception.
pub mod clock;
/// Host surfaces.
pub mod render;

pub use crate::archive::header::{RECORD_SIZE, header_checksum, padded_len};
pub use crate::archive::tarball::{
    ArchivePart, DEFAULT_MODE, EntryOptions, EntryPayload, MAX_CHUNK_BYTES, Tarball,
};
pub use crate::capture::config::{EncodeFailurePolicy, RecordingConfig};
pub use crate::capture::encoder::{
    FrameCompleter, FrameEncoder, InlinePngEncoder, PendingFrame, PngFrameEncoder, encode_png,
};
pub use crate::capture::export::{DirPartSink, InMemoryPartSink, PartSink};
pub use crate::capture::scheduler::{
    CaptureEvent, CaptureScheduler, ProgressReport, RecordingStatus, SessionSummary, TickOutcome,
};
pub use crate::clock::host::{
    FrameCallback, FrameQueue, FrameRequester, HostClock, ManualClock, MonotonicClock, TimeSource,
};
pub use crate::clock::scope::ClockScope;
pub use crate::foundation::core::{FrameNumber, FrameRate};
pub use crate::foundation::error::{FramecapError, FramecapResult};
pub use crate::render::demo::DemoScene;
pub use crate::render::frame::FrameRGBA;
