//! Frame-capture scheduling and chunked export.
//!
//! The [`scheduler::CaptureScheduler`] is called once per host tick. It hands the rendered surface
//! to a [`encoder::FrameEncoder`], appends the result to the current archive, advances the virtual
//! clock and releases the host's animation callbacks. Parts are handed to a [`export::PartSink`].

/// Recording options.
pub mod config;
/// Frame encoders and the single-slot completion token.
pub mod encoder;
/// Part naming, bookkeeping and sinks.
pub mod export;
/// Capture pacing state machine.
pub mod scheduler;
