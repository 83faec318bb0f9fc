use crate::archive::tarball::{EntryOptions, Tarball};
use crate::capture::config::{EncodeFailurePolicy, RecordingConfig};
use crate::capture::encoder::{FrameEncoder, PendingFrame};
use crate::capture::export::{ExportManager, PartSink, timestamp_base_name};
use crate::clock::host::HostClock;
use crate::clock::scope::ClockScope;
use crate::foundation::core::FrameNumber;
use crate::foundation::error::{FramecapError, FramecapResult};
use crate::render::frame::FrameRGBA;

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Recording lifecycle as observed by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingStatus {
    /// No session; the host clock is untouched.
    Idle,
    /// Session armed; the next tick is discarded so it can finish on real time.
    ArmedNotStarted,
    /// Ticks are captured.
    Recording,
}

/// Result of one [`CaptureScheduler::update`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Not recording; nothing happened.
    Idle,
    /// First tick of a session: surface discarded, queued callbacks released.
    Armed {
        /// Callbacks invoked with the virtual start time.
        callbacks: usize,
    },
    /// Surface handed to the encoder; completion is pending.
    Pending {
        /// Frame being encoded.
        frame: FrameNumber,
    },
    /// A capture is still in flight; this tick's surface was dropped.
    Busy {
        /// Frame being encoded.
        frame: FrameNumber,
    },
    /// A capture completed during this tick.
    Completed(CaptureEvent),
}

/// One finished capture slot.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureEvent {
    /// Frame number of the slot.
    pub frame: FrameNumber,
    /// Virtual time after the slot was committed.
    pub virtual_time_ms: f64,
    /// The encoder failed and the slot was left empty.
    pub skipped: bool,
    /// Animation callbacks released after the slot.
    pub callbacks: usize,
    /// Part emitted because the size ceiling was reached.
    pub rotated_part: Option<String>,
    /// Present when this slot ended the session.
    pub finished: Option<SessionSummary>,
}

/// Totals reported when a session ends.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    /// Base name of the emitted parts.
    pub base_name: String,
    /// Frames stored in the archive.
    pub frames_captured: u64,
    /// Frames lost to encoder failures.
    pub frames_skipped: u64,
    /// Emitted part names in order.
    pub parts: Vec<String>,
    /// Bytes emitted across all parts.
    pub bytes_emitted: u64,
    /// Virtual time covered by the session.
    pub duration_ms: f64,
}

/// Live counters of the active session.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressReport {
    /// Current status.
    pub status: RecordingStatus,
    /// Next frame number to be captured.
    pub next_frame: FrameNumber,
    /// Stored frames after which the session stops, `0` when unbounded.
    pub frame_limit: u64,
    /// Frames stored so far.
    pub frames_captured: u64,
    /// Frames lost to encoder failures.
    pub frames_skipped: u64,
    /// Current virtual time.
    pub virtual_time_ms: f64,
    /// Encoded size of the unsaved part.
    pub part_bytes: u64,
    /// Bytes already emitted in earlier parts.
    pub bytes_emitted: u64,
    /// Parts already emitted.
    pub parts_emitted: u32,
}

struct InFlight {
    frame: FrameNumber,
    pending: PendingFrame,
}

struct RecordingSession {
    scope: ClockScope,
    started: bool,
    start_ms: f64,
    interval_ms: f64,
    frame_index: u64,
    frame_limit: u64,
    frames_captured: u64,
    frames_skipped: u64,
    part_ceiling_mb: f64,
    on_failure: EncodeFailurePolicy,
    entry_opts: EntryOptions,
    tape: Tarball,
    export: ExportManager,
    in_flight: Option<InFlight>,
}

impl RecordingSession {
    fn status(&self) -> RecordingStatus {
        if self.started {
            RecordingStatus::Recording
        } else {
            RecordingStatus::ArmedNotStarted
        }
    }
}

/// Deterministic capture scheduler.
///
/// While recording, the host's clock only moves when a frame has been captured, by exactly one
/// frame interval, regardless of how long encoding took. At most one capture is in flight.
pub struct CaptureScheduler<E, S> {
    host: HostClock,
    encoder: E,
    sink: S,
    session: Option<RecordingSession>,
}

impl<E: FrameEncoder, S: PartSink> CaptureScheduler<E, S> {
    /// Create an idle scheduler for `host`.
    pub fn new(host: HostClock, encoder: E, sink: S) -> Self {
        Self {
            host,
            encoder,
            sink,
            session: None,
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> RecordingStatus {
        self.session
            .as_ref()
            .map_or(RecordingStatus::Idle, RecordingSession::status)
    }

    /// Return `true` unless idle.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Host time: virtual while a session is active, real otherwise.
    pub fn now(&self) -> f64 {
        match &self.session {
            Some(s) => s.scope.now(),
            None => self.host.real_now(),
        }
    }

    /// The host clock this scheduler drives.
    pub fn host(&self) -> &HostClock {
        &self.host
    }

    /// Borrow the part sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the part sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Live counters, `None` when idle.
    pub fn progress(&self) -> Option<ProgressReport> {
        let s = self.session.as_ref()?;
        Some(ProgressReport {
            status: s.status(),
            next_frame: FrameNumber(s.frame_index + 1),
            frame_limit: s.frame_limit,
            frames_captured: s.frames_captured,
            frames_skipped: s.frames_skipped,
            virtual_time_ms: s.scope.now(),
            part_bytes: s.tape.len(),
            bytes_emitted: s.export.bytes_emitted(),
            parts_emitted: s.export.parts_emitted(),
        })
    }

    /// Begin a session and take over the host clock.
    #[tracing::instrument(skip(self, cfg), fields(fps = cfg.frame_rate))]
    pub fn start(&mut self, cfg: &RecordingConfig) -> FramecapResult<()> {
        if self.session.is_some() {
            return Err(FramecapError::session("a recording is already active"));
        }
        cfg.validate()?;
        let fps = cfg.frame_rate()?;
        let frame_limit = cfg.frame_limit()?;

        let start_ms = match cfg.start_offset_seconds {
            Some(secs) => secs * 1000.0,
            None => self.host.real_now(),
        };
        let started_at = chrono::Utc::now();
        let base_name = cfg
            .archive_name
            .clone()
            .unwrap_or_else(|| timestamp_base_name(started_at));

        let scope = ClockScope::arm(&self.host, start_ms)?;
        tracing::info!(
            start_ms,
            frame_limit,
            part_ceiling_mb = cfg.part_size_ceiling_mb,
            archive = %base_name,
            "recording armed"
        );

        self.session = Some(RecordingSession {
            scope,
            started: false,
            start_ms,
            interval_ms: fps.interval_ms(),
            frame_index: 0,
            frame_limit,
            frames_captured: 0,
            frames_skipped: 0,
            part_ceiling_mb: cfg.part_size_ceiling_mb,
            on_failure: cfg.on_encode_failure,
            entry_opts: EntryOptions {
                mtime: Some(started_at.timestamp().max(0) as u64),
                ..EntryOptions::default()
            },
            tape: Tarball::new(),
            export: ExportManager::new(base_name),
            in_flight: None,
        });
        Ok(())
    }

    /// Advance the session by one host tick.
    ///
    /// `surface` must be what the host rendered during this tick.
    pub fn update(&mut self, surface: &FrameRGBA) -> FramecapResult<TickOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        if !session.started {
            session.started = true;
            let callbacks = session.scope.drain();
            tracing::debug!(callbacks, "recording started; arming tick discarded");
            return Ok(TickOutcome::Armed { callbacks });
        }

        if let Some(flight) = &session.in_flight {
            // The surface was rendered before the pending capture released the host's callbacks,
            // so it shows the previous frame again.
            let frame = flight.frame;
            return Ok(match self.poll()? {
                Some(event) => TickOutcome::Completed(event),
                None => {
                    tracing::trace!(frame = frame.0, "capture in flight; tick dropped");
                    TickOutcome::Busy { frame }
                }
            });
        }

        let frame = FrameNumber(session.frame_index + 1);
        tracing::debug!(
            frame = frame.0,
            virtual_ms = session.scope.now(),
            "capturing frame"
        );
        let pending = self.encoder.submit(surface);
        session.in_flight = Some(InFlight { frame, pending });

        Ok(match self.poll()? {
            Some(event) => TickOutcome::Completed(event),
            None => TickOutcome::Pending { frame },
        })
    }

    /// Finish the in-flight capture if the encoder is done, without blocking.
    pub fn poll(&mut self) -> FramecapResult<Option<CaptureEvent>> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        let Some(result) = session
            .in_flight
            .as_ref()
            .and_then(|f| f.pending.try_take())
        else {
            return Ok(None);
        };
        let Some(flight) = session.in_flight.take() else {
            return Ok(None);
        };
        self.complete(flight.frame, result).map(Some)
    }

    /// Block until the in-flight capture, if any, is finished.
    pub fn wait(&mut self) -> FramecapResult<Option<CaptureEvent>> {
        let Some(flight) = self.session.as_mut().and_then(|s| s.in_flight.take()) else {
            return Ok(None);
        };
        let result = flight.pending.wait();
        self.complete(flight.frame, result).map(Some)
    }

    fn complete(
        &mut self,
        frame: FrameNumber,
        result: FramecapResult<Vec<u8>>,
    ) -> FramecapResult<CaptureEvent> {
        let name = frame.entry_name(self.encoder.extension());
        let Some(session) = self.session.as_mut() else {
            return Err(FramecapError::session("capture completed without a session"));
        };

        let stored = result.and_then(|bytes| session.tape.append(&name, bytes, &session.entry_opts));
        let skipped = match stored {
            Ok(()) => false,
            Err(err) => match session.on_failure {
                EncodeFailurePolicy::Skip => {
                    tracing::warn!(frame = frame.0, error = %err, "frame dropped");
                    true
                }
                EncodeFailurePolicy::Abort => {
                    tracing::warn!(frame = frame.0, error = %err, "aborting recording");
                    self.finish_session()?;
                    return Err(err);
                }
            },
        };

        let virtual_time_ms = session.scope.advance(session.interval_ms);
        session.frame_index += 1;
        if skipped {
            session.frames_skipped += 1;
        } else {
            session.frames_captured += 1;
        }
        let callbacks = session.scope.drain();
        tracing::debug!(
            frame = frame.0,
            virtual_time_ms,
            callbacks,
            part_bytes = session.tape.len(),
            "frame committed"
        );

        let mut event = CaptureEvent {
            frame,
            virtual_time_ms,
            skipped,
            callbacks,
            rotated_part: None,
            finished: None,
        };

        if session.frame_limit > 0 && session.frames_captured >= session.frame_limit {
            event.finished = self.finish_session()?;
        } else if session.tape.len() as f64 / BYTES_PER_MB >= session.part_ceiling_mb {
            let name = session.export.rotate(&session.tape, &mut self.sink)?;
            session.tape = Tarball::new();
            event.rotated_part = Some(name);
        }
        Ok(event)
    }

    /// End the session, restore the host clock and emit the final part.
    ///
    /// A capture still in flight is awaited first. Returns `None` when idle.
    #[tracing::instrument(skip(self))]
    pub fn stop(&mut self) -> FramecapResult<Option<SessionSummary>> {
        let in_flight = self
            .session
            .as_ref()
            .is_some_and(|s| s.in_flight.is_some());
        if in_flight && let Some(event) = self.wait()? {
            if let Some(summary) = event.finished {
                return Ok(Some(summary));
            }
        }
        self.finish_session()
    }

    /// Start when idle, stop otherwise.
    pub fn toggle(&mut self, cfg: &RecordingConfig) -> FramecapResult<Option<SessionSummary>> {
        if self.session.is_none() {
            self.start(cfg)?;
            Ok(None)
        } else {
            self.stop()
        }
    }

    fn finish_session(&mut self) -> FramecapResult<Option<SessionSummary>> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        let RecordingSession {
            scope,
            start_ms,
            frames_captured,
            frames_skipped,
            tape,
            mut export,
            ..
        } = session;

        let end_ms = scope.now();
        drop(scope);

        let last = export.finish(&tape, &mut self.sink)?;
        tracing::info!(
            frames_captured,
            frames_skipped,
            parts = export.parts_emitted(),
            last_part = %last,
            "recording stopped"
        );

        Ok(Some(SessionSummary {
            base_name: export.base_name().to_owned(),
            frames_captured,
            frames_skipped,
            parts: export.part_names().to_vec(),
            bytes_emitted: export.bytes_emitted(),
            duration_ms: end_ms - start_ms,
        }))
    }
}

impl<E, S> Drop for CaptureScheduler<E, S> {
    fn drop(&mut self) {
        if let Some(s) = &self.session {
            tracing::warn!(
                frames_captured = s.frames_captured,
                "scheduler dropped while recording; unsaved frames are discarded"
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/scheduler.rs"]
mod tests;
