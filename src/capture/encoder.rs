use std::sync::mpsc;

use crate::foundation::error::{FramecapError, FramecapResult};
use crate::foundation::math::unpremultiply_rgba8;
use crate::render::frame::FrameRGBA;

/// Completion token for one frame handed to a [`FrameEncoder`].
///
/// The scheduler keeps at most one of these alive; it resolves exactly once.
#[derive(Debug)]
pub struct PendingFrame {
    rx: mpsc::Receiver<FramecapResult<Vec<u8>>>,
}

/// Producer half of a [`PendingFrame`].
#[derive(Debug)]
pub struct FrameCompleter {
    tx: mpsc::Sender<FramecapResult<Vec<u8>>>,
}

impl FrameCompleter {
    /// Resolve the pending frame. Dropping the completer without calling this is a failure.
    pub fn complete(self, result: FramecapResult<Vec<u8>>) {
        // The receiver may be gone if the session was torn down; nothing to report then.
        let _ = self.tx.send(result);
    }
}

impl PendingFrame {
    /// Create a pending frame and the handle that resolves it.
    pub fn channel() -> (FrameCompleter, PendingFrame) {
        let (tx, rx) = mpsc::channel();
        (FrameCompleter { tx }, PendingFrame { rx })
    }

    /// A frame that is already resolved.
    pub fn ready(result: FramecapResult<Vec<u8>>) -> Self {
        let (done, pending) = Self::channel();
        done.complete(result);
        pending
    }

    /// Non-blocking check: `None` while the encoder is still working.
    pub fn try_take(&self) -> Option<FramecapResult<Vec<u8>>> {
        match self.rx.try_recv() {
            Ok(r) => Some(r),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(FramecapError::frame_encode(
                "frame encoder dropped the frame without completing it",
            ))),
        }
    }

    /// Block until the encoder resolves the frame.
    pub fn wait(self) -> FramecapResult<Vec<u8>> {
        self.rx.recv().map_err(|_| {
            FramecapError::frame_encode("frame encoder dropped the frame without completing it")
        })?
    }
}

/// Turns a rendered surface into the bytes of one archive entry.
pub trait FrameEncoder {
    /// File extension used for entry names (without the dot).
    fn extension(&self) -> &str {
        "png"
    }

    /// Start encoding `frame`; completion is signalled through the returned token.
    fn submit(&mut self, frame: &FrameRGBA) -> PendingFrame;
}

impl<E: FrameEncoder + ?Sized> FrameEncoder for Box<E> {
    fn extension(&self) -> &str {
        (**self).extension()
    }

    fn submit(&mut self, frame: &FrameRGBA) -> PendingFrame {
        (**self).submit(frame)
    }
}

/// PNG encoder that runs each frame on a worker thread.
#[derive(Debug, Default)]
pub struct PngFrameEncoder;

impl PngFrameEncoder {
    /// Create the encoder.
    pub fn new() -> Self {
        Self
    }
}

impl FrameEncoder for PngFrameEncoder {
    fn submit(&mut self, frame: &FrameRGBA) -> PendingFrame {
        let (done, pending) = PendingFrame::channel();
        let frame = frame.clone();
        let spawned = std::thread::Builder::new()
            .name("framecap-png".to_owned())
            .spawn(move || done.complete(encode_png(&frame)));
        match spawned {
            Ok(_) => pending,
            Err(e) => PendingFrame::ready(Err(FramecapError::frame_encode(format!(
                "failed to spawn png worker: {e}"
            )))),
        }
    }
}

/// PNG encoder that completes on the calling thread.
#[derive(Debug, Default)]
pub struct InlinePngEncoder;

impl InlinePngEncoder {
    /// Create the encoder.
    pub fn new() -> Self {
        Self
    }
}

impl FrameEncoder for InlinePngEncoder {
    fn submit(&mut self, frame: &FrameRGBA) -> PendingFrame {
        PendingFrame::ready(encode_png(frame))
    }
}

/// Encode a frame as an RGBA8 PNG.
pub fn encode_png(frame: &FrameRGBA) -> FramecapResult<Vec<u8>> {
    use image::ImageEncoder as _;

    frame.validate()?;
    let straight;
    let pixels: &[u8] = if frame.premultiplied {
        let mut buf = vec![0u8; frame.data.len()];
        unpremultiply_rgba8(&mut buf, &frame.data);
        straight = buf;
        &straight
    } else {
        &frame.data
    };

    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            pixels,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| FramecapError::frame_encode(format!("png encode failed: {e}")))?;
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/capture/encoder.rs"]
mod tests;
