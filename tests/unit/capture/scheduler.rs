use super::*;
use crate::capture::encoder::FrameCompleter;
use crate::capture::export::InMemoryPartSink;
use crate::clock::host::{FrameQueue, ManualClock};
use std::collections::VecDeque;
use std::sync::Arc;

/// Completes immediately with `size` bytes, failing on listed frame numbers.
struct FixedEncoder {
    size: usize,
    calls: u64,
    fail_on: Vec<u64>,
}

impl FixedEncoder {
    fn new(size: usize) -> Self {
        Self {
            size,
            calls: 0,
            fail_on: Vec::new(),
        }
    }
}

impl FrameEncoder for FixedEncoder {
    fn submit(&mut self, _frame: &FrameRGBA) -> PendingFrame {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return PendingFrame::ready(Err(FramecapError::frame_encode("boom")));
        }
        PendingFrame::ready(Ok(vec![self.calls as u8; self.size]))
    }
}

/// Leaves every frame pending until the test resolves it.
#[derive(Default)]
struct ManualEncoder {
    completers: Arc<parking_lot::Mutex<VecDeque<FrameCompleter>>>,
}

impl FrameEncoder for ManualEncoder {
    fn submit(&mut self, _frame: &FrameRGBA) -> PendingFrame {
        let (done, pending) = PendingFrame::channel();
        self.completers.lock().push_back(done);
        pending
    }
}

struct Harness {
    time: Arc<ManualClock>,
    queue: Arc<FrameQueue>,
    host: HostClock,
}

fn harness() -> Harness {
    let time = Arc::new(ManualClock::new(10_000.0));
    let queue = Arc::new(FrameQueue::new());
    let host = HostClock::new(time.clone(), queue.clone());
    Harness { time, queue, host }
}

fn surface() -> FrameRGBA {
    FrameRGBA::transparent(2, 2)
}

fn cfg(duration: Option<f64>, fps: f64) -> RecordingConfig {
    RecordingConfig {
        start_offset_seconds: Some(0.0),
        duration_seconds: duration,
        frame_rate: fps,
        archive_name: Some("take".to_owned()),
        ..RecordingConfig::default()
    }
}

#[test]
fn idle_update_is_a_noop_and_now_is_real() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    assert_eq!(s.update(&surface()).unwrap(), TickOutcome::Idle);
    assert_eq!(s.status(), RecordingStatus::Idle);
    assert_eq!(s.now(), 10_000.0);
    assert!(s.progress().is_none());
    assert_eq!(s.stop().unwrap(), None);
}

#[test]
fn first_tick_is_discarded_and_releases_callbacks_at_start_time() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    s.start(&cfg(None, 10.0)).unwrap();
    assert_eq!(s.status(), RecordingStatus::ArmedNotStarted);
    assert_eq!(h.host.now(), 0.0);

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen2 = Arc::clone(&seen);
    h.host.request_frame(Box::new(move |t| seen2.lock().push(t)));

    assert_eq!(
        s.update(&surface()).unwrap(),
        TickOutcome::Armed { callbacks: 1 }
    );
    assert_eq!(*seen.lock(), vec![0.0]);
    assert_eq!(s.status(), RecordingStatus::Recording);
    assert_eq!(s.progress().unwrap().frames_captured, 0);
}

#[test]
fn virtual_time_advances_one_interval_per_capture_regardless_of_wall_time() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    s.start(&cfg(None, 25.0)).unwrap();
    s.update(&surface()).unwrap();

    for i in 1..=5u64 {
        h.time.advance(1234.5);
        let TickOutcome::Completed(ev) = s.update(&surface()).unwrap() else {
            panic!("expected synchronous completion");
        };
        assert_eq!(ev.frame, FrameNumber(i));
        assert_eq!(ev.virtual_time_ms, 40.0 * i as f64);
        assert_eq!(s.now(), 40.0 * i as f64);
        assert_eq!(h.host.now(), 40.0 * i as f64);
    }
}

#[test]
fn unbounded_recording_never_self_stops() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    s.start(&cfg(None, 30.0)).unwrap();
    for _ in 0..200 {
        s.update(&surface()).unwrap();
    }
    assert_eq!(s.status(), RecordingStatus::Recording);
    assert_eq!(s.progress().unwrap().frames_captured, 199);
    assert!(s.sink().parts().is_empty());
}

#[test]
fn bounded_recording_stops_after_limit_with_single_unsuffixed_part() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(3), InMemoryPartSink::new());
    s.start(&cfg(Some(1.0), 10.0)).unwrap();
    s.update(&surface()).unwrap();

    let mut finished = None;
    for _ in 0..10 {
        if let TickOutcome::Completed(ev) = s.update(&surface()).unwrap()
            && ev.finished.is_some()
        {
            finished = ev.finished;
        }
    }
    let summary = finished.expect("session should finish on the 10th frame");
    assert_eq!(summary.frames_captured, 10);
    assert_eq!(summary.parts, vec!["take.tar".to_owned()]);
    assert_eq!(summary.duration_ms, 1000.0);
    assert_eq!(s.status(), RecordingStatus::Idle);
    assert!(!h.host.is_intercepted());
    assert_eq!(s.sink().names(), vec!["take.tar"]);
    assert_eq!(s.update(&surface()).unwrap(), TickOutcome::Idle);
}

#[test]
fn async_capture_is_single_flight_and_busy_ticks_drop_surfaces() {
    let h = harness();
    let enc = ManualEncoder::default();
    let completers = Arc::clone(&enc.completers);
    let mut s = CaptureScheduler::new(h.host.clone(), enc, InMemoryPartSink::new());
    s.start(&cfg(None, 10.0)).unwrap();
    s.update(&surface()).unwrap();

    assert_eq!(
        s.update(&surface()).unwrap(),
        TickOutcome::Pending {
            frame: FrameNumber(1)
        }
    );
    assert_eq!(
        s.update(&surface()).unwrap(),
        TickOutcome::Busy {
            frame: FrameNumber(1)
        }
    );
    assert_eq!(completers.lock().len(), 1);
    assert_eq!(s.now(), 0.0);

    completers.lock().pop_front().unwrap().complete(Ok(vec![1, 2, 3]));
    let TickOutcome::Completed(ev) = s.update(&surface()).unwrap() else {
        panic!("expected completion");
    };
    assert_eq!(ev.frame, FrameNumber(1));
    assert_eq!(s.now(), 100.0);

    assert_eq!(
        s.update(&surface()).unwrap(),
        TickOutcome::Pending {
            frame: FrameNumber(2)
        }
    );
    assert_eq!(completers.lock().len(), 1);
}

#[test]
fn stop_waits_for_in_flight_capture_before_flushing() {
    let h = harness();
    let enc = ManualEncoder::default();
    let completers = Arc::clone(&enc.completers);
    let mut s = CaptureScheduler::new(h.host.clone(), enc, InMemoryPartSink::new());
    s.start(&cfg(None, 10.0)).unwrap();
    s.update(&surface()).unwrap();
    s.update(&surface()).unwrap();

    let done = completers.lock().pop_front().unwrap();
    let worker = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(20));
        done.complete(Ok(vec![7u8; 10]));
    });
    let summary = s.stop().unwrap().unwrap();
    worker.join().unwrap();

    assert_eq!(summary.frames_captured, 1);
    let (_, part) = &s.sink().parts()[0];
    assert_eq!(part.len(), 512 + 512 + 1024);
}

#[test]
fn stop_with_zero_frames_emits_header_only_part() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    s.start(&cfg(None, 30.0)).unwrap();
    let summary = s.stop().unwrap().unwrap();
    assert_eq!(summary.frames_captured, 0);
    assert_eq!(summary.parts, vec!["take.tar".to_owned()]);
    assert_eq!(s.sink().parts()[0].1.len(), 1024);
    assert!(!h.host.is_intercepted());
}

#[test]
fn parts_rotate_once_when_ceiling_is_crossed() {
    let h = harness();
    let mut s = CaptureScheduler::new(
        h.host.clone(),
        FixedEncoder::new(300_000),
        InMemoryPartSink::new(),
    );
    let c = RecordingConfig {
        part_size_ceiling_mb: 1.0,
        ..cfg(None, 30.0)
    };
    s.start(&c).unwrap();
    s.update(&surface()).unwrap();

    let mut rotations = Vec::new();
    for _ in 0..5 {
        if let TickOutcome::Completed(ev) = s.update(&surface()).unwrap()
            && let Some(name) = ev.rotated_part
        {
            rotations.push((ev.frame, name));
        }
    }
    // 300_000 bytes pad to 300_032 plus a 512-byte header; the 4th frame crosses 10^6.
    assert_eq!(rotations, vec![(FrameNumber(4), "take_001.tar".to_owned())]);
    assert_eq!(s.progress().unwrap().parts_emitted, 1);
    assert_eq!(s.progress().unwrap().part_bytes, 300_544);

    let summary = s.stop().unwrap().unwrap();
    assert_eq!(summary.parts, vec!["take_001.tar".to_owned(), "take_002.tar".to_owned()]);
    assert_eq!(summary.bytes_emitted, 4 * 300_544 + 1024 + 300_544 + 1024);
}

#[test]
fn rotation_at_final_frame_still_emits_closing_part() {
    let h = harness();
    let mut s = CaptureScheduler::new(
        h.host.clone(),
        FixedEncoder::new(600_000),
        InMemoryPartSink::new(),
    );
    let c = RecordingConfig {
        part_size_ceiling_mb: 1.0,
        ..cfg(None, 30.0)
    };
    s.start(&c).unwrap();
    s.update(&surface()).unwrap();
    s.update(&surface()).unwrap();
    s.update(&surface()).unwrap();
    let summary = s.stop().unwrap().unwrap();
    assert_eq!(summary.parts, vec!["take_001.tar".to_owned(), "take_002.tar".to_owned()]);
    assert_eq!(s.sink().parts()[1].1.len(), 1024);
}

#[test]
fn abort_policy_stops_and_flushes_captured_frames() {
    let h = harness();
    let mut enc = FixedEncoder::new(4);
    enc.fail_on = vec![3];
    let mut s = CaptureScheduler::new(h.host.clone(), enc, InMemoryPartSink::new());
    s.start(&cfg(None, 30.0)).unwrap();
    s.update(&surface()).unwrap();
    s.update(&surface()).unwrap();
    s.update(&surface()).unwrap();
    let err = s.update(&surface()).unwrap_err();

    assert!(matches!(err, FramecapError::FrameEncode(_)));
    assert_eq!(s.status(), RecordingStatus::Idle);
    assert!(!h.host.is_intercepted());
    let (name, part) = &s.sink().parts()[0];
    assert_eq!(name, "take.tar");
    assert_eq!(part.len(), 2 * 1024 + 1024);
}

#[test]
fn skip_policy_leaves_a_gap_and_keeps_time_moving() {
    let h = harness();
    let mut enc = FixedEncoder::new(4);
    enc.fail_on = vec![2];
    let mut s = CaptureScheduler::new(h.host.clone(), enc, InMemoryPartSink::new());
    let c = RecordingConfig {
        on_encode_failure: EncodeFailurePolicy::Skip,
        ..cfg(Some(0.1), 30.0)
    };
    s.start(&c).unwrap();
    s.update(&surface()).unwrap();

    let mut events = Vec::new();
    while s.is_recording() {
        if let TickOutcome::Completed(ev) = s.update(&surface()).unwrap() {
            events.push(ev);
        }
    }
    // Limit is 3 stored frames; the failed slot 2 is not reused, so the session ends on slot 4.
    assert_eq!(events.len(), 4);
    assert!(events[1].skipped);
    assert_eq!(events[1].frame, FrameNumber(2));
    assert_eq!(events[3].frame, FrameNumber(4));
    let summary = events[3].finished.clone().unwrap();
    assert_eq!(summary.frames_captured, 3);
    assert_eq!(summary.frames_skipped, 1);
    assert!((summary.duration_ms - 4000.0 / 30.0).abs() < 1e-9);

    let bytes = s.sink().parts()[0].1.to_vec();
    let names: Vec<String> = tar::Archive::new(bytes.as_slice())
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["0000001.png", "0000003.png", "0000004.png"]);
}

#[test]
fn skipped_frames_do_not_count_toward_the_limit() {
    let h = harness();
    let mut enc = FixedEncoder::new(4);
    enc.fail_on = vec![2];
    let mut s = CaptureScheduler::new(h.host.clone(), enc, InMemoryPartSink::new());
    let c = RecordingConfig {
        on_encode_failure: EncodeFailurePolicy::Skip,
        ..cfg(Some(0.3), 10.0)
    };
    s.start(&c).unwrap();
    assert_eq!(s.progress().unwrap().frame_limit, 3);

    let mut summary = None;
    for _ in 0..10 {
        if let TickOutcome::Completed(ev) = s.update(&surface()).unwrap()
            && ev.finished.is_some()
        {
            summary = ev.finished;
            break;
        }
    }
    let summary = summary.unwrap();
    assert_eq!(summary.frames_captured, 3);
    assert_eq!(summary.frames_skipped, 1);
    assert_eq!(s.status(), RecordingStatus::Idle);
}

#[test]
fn start_while_recording_is_rejected() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    s.start(&cfg(None, 30.0)).unwrap();
    assert!(matches!(
        s.start(&cfg(None, 30.0)),
        Err(FramecapError::Session(_))
    ));
}

#[test]
fn toggle_alternates_start_and_stop() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    assert_eq!(s.toggle(&cfg(None, 30.0)).unwrap(), None);
    assert!(s.is_recording());
    assert!(s.toggle(&cfg(None, 30.0)).unwrap().is_some());
    assert!(!s.is_recording());
}

#[test]
fn default_start_uses_current_host_time_and_timestamp_name() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    s.start(&RecordingConfig::default()).unwrap();
    assert_eq!(s.now(), 10_000.0);
    let summary = s.stop().unwrap().unwrap();
    assert!(summary.parts[0].ends_with("Z.tar"));
    assert!(!summary.parts[0].contains('_'));
}

#[test]
fn host_loop_callbacks_are_returned_to_real_registrar_on_stop() {
    let h = harness();
    let mut s = CaptureScheduler::new(h.host.clone(), FixedEncoder::new(1), InMemoryPartSink::new());
    s.start(&cfg(None, 30.0)).unwrap();
    h.host.request_frame(Box::new(|_| {}));
    s.stop().unwrap();
    assert_eq!(h.queue.pending(), 1);
}
