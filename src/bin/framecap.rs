use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;

use framecap::{
    CaptureScheduler, DemoScene, DirPartSink, EncodeFailurePolicy, FrameEncoder, FrameQueue,
    HostClock, InlinePngEncoder, MonotonicClock, PngFrameEncoder, RecordingConfig,
    SessionSummary, TickOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "framecap", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record the demo scene into tar archives of PNG frames.
    Record(RecordArgs),
}

#[derive(Parser, Debug)]
struct RecordArgs {
    /// Output directory for archive parts.
    #[arg(long)]
    out: PathBuf,

    /// Recording config JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Virtual start time in seconds (default: current host time).
    #[arg(long)]
    start: Option<f64>,

    /// Recording length in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Capture frame rate.
    #[arg(long)]
    fps: Option<f64>,

    /// Part size ceiling in megabytes (10^6 bytes).
    #[arg(long)]
    part_size_mb: Option<f64>,

    /// Base name for archive parts (default: start timestamp).
    #[arg(long)]
    name: Option<String>,

    /// Frames to record when the duration does not bound the session.
    #[arg(long, default_value_t = 90)]
    frames: u64,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 200)]
    height: u32,

    /// Keep recording when a frame fails to encode.
    #[arg(long, default_value_t = false)]
    skip_failed_frames: bool,

    /// Encode frames on the render thread instead of a worker.
    #[arg(long, default_value_t = false)]
    inline_encode: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Record(args) => cmd_record(args),
    }
}

fn recording_config(args: &RecordArgs) -> anyhow::Result<RecordingConfig> {
    let mut cfg = match &args.config {
        Some(path) => RecordingConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => RecordingConfig::default(),
    };
    if args.start.is_some() {
        cfg.start_offset_seconds = args.start;
    }
    if args.duration.is_some() {
        cfg.duration_seconds = args.duration;
    }
    if let Some(fps) = args.fps {
        cfg.frame_rate = fps;
    }
    if let Some(mb) = args.part_size_mb {
        cfg.part_size_ceiling_mb = mb;
    }
    if args.name.is_some() {
        cfg.archive_name = args.name.clone();
    }
    if args.skip_failed_frames {
        cfg.on_encode_failure = EncodeFailurePolicy::Skip;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Keep the scene's animation loop alive through the host's frame requester.
fn schedule_animation(host: HostClock, scene: Arc<Mutex<DemoScene>>) {
    let next = host.clone();
    host.request_frame(Box::new(move |now_ms| {
        scene.lock().animate(now_ms);
        schedule_animation(next, scene);
    }));
}

fn cmd_record(args: RecordArgs) -> anyhow::Result<()> {
    let cfg = recording_config(&args)?;
    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width and --height must be non-zero");
    }

    let display = Arc::new(FrameQueue::new());
    let host = HostClock::new(Arc::new(MonotonicClock::new()), display.clone());
    let scene = Arc::new(Mutex::new(DemoScene::new(args.width, args.height)));
    schedule_animation(host.clone(), Arc::clone(&scene));

    let encoder: Box<dyn FrameEncoder> = if args.inline_encode {
        Box::new(InlinePngEncoder::new())
    } else {
        Box::new(PngFrameEncoder::new())
    };
    let mut rec = CaptureScheduler::new(host.clone(), encoder, DirPartSink::new(&args.out));
    rec.toggle(&cfg)?;

    let bounded = cfg.frame_limit()? > 0;
    let mut captured = 0u64;
    let summary: Option<SessionSummary> = loop {
        // Empty while recording: the scope holds the animation callbacks.
        display.fire(host.real_now());
        let frame = scene.lock().render();

        match rec.update(&frame)? {
            TickOutcome::Idle => break None,
            TickOutcome::Armed { .. } => {}
            TickOutcome::Pending { .. } | TickOutcome::Busy { .. } => {
                std::thread::sleep(Duration::from_millis(1));
            }
            TickOutcome::Completed(ev) => {
                if let Some(done) = ev.finished {
                    break Some(done);
                }
                if !ev.skipped {
                    captured += 1;
                }
                if !bounded && captured >= args.frames {
                    break rec.toggle(&cfg)?;
                }
            }
        }
    };

    let summary = summary.context("recording ended without a summary")?;
    for path in rec.sink().written() {
        eprintln!("wrote {}", path.display());
    }
    eprintln!(
        "captured {} frames ({} skipped) in {} part(s), {} bytes, {:.1} ms of virtual time",
        summary.frames_captured,
        summary.frames_skipped,
        summary.parts.len(),
        summary.bytes_emitted,
        summary.duration_ms
    );
    Ok(())
}
