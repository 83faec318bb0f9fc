use kurbo::{Affine, Point, Rect, Vec2};

use crate::foundation::math::div255_round;
use crate::render::frame::FrameRGBA;

/// A spinning square on a dark background.
///
/// The pose is a pure function of the animation time, so a scene driven by a virtual clock renders
/// identical frames on every run.
#[derive(Clone, Debug)]
pub struct DemoScene {
    width: u32,
    height: u32,
    /// Rotation speed in quarter turns per second.
    pub speed: f64,
    time_ms: f64,
}

const BACKGROUND: [u8; 4] = [18, 20, 28, 255];
const SQUARE_ALPHA: u8 = 220;

impl DemoScene {
    /// Create a scene for a `width` x `height` surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            speed: 0.5,
            time_ms: 0.0,
        }
    }

    /// Animation time last applied with [`DemoScene::animate`].
    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    /// Move the animation to `time_ms`.
    pub fn animate(&mut self, time_ms: f64) {
        self.time_ms = time_ms;
    }

    /// Scene-to-canvas transform for the current time.
    pub fn transform(&self) -> Affine {
        let angle = (self.time_ms / 1000.0) * std::f64::consts::FRAC_PI_2 * self.speed;
        let center = Vec2::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0);
        Affine::translate(center) * Affine::rotate(angle)
    }

    /// Render the current pose as premultiplied RGBA8.
    pub fn render(&self) -> FrameRGBA {
        let mut frame = FrameRGBA::transparent(self.width, self.height);
        let half = f64::from(self.width.min(self.height)) * 0.2;
        let square = Rect::new(-half, -half, half, half);
        let inv = self.transform().inverse();

        for (i, px) in frame.data.chunks_exact_mut(4).enumerate() {
            let x = (i as u32 % self.width) as f64 + 0.5;
            let y = (i as u32 / self.width) as f64 + 0.5;
            let local = inv * Point::new(x, y);
            if square.contains(local) {
                let u = ((local.x + half) / (2.0 * half)).clamp(0.0, 1.0);
                let v = ((local.y + half) / (2.0 * half)).clamp(0.0, 1.0);
                let straight = [(u * 255.0) as u8, (v * 255.0) as u8, 200];
                let a = u32::from(SQUARE_ALPHA);
                let inv_a = 255 - a;
                for c in 0..3 {
                    px[c] = div255_round(
                        u32::from(straight[c]) * a + u32::from(BACKGROUND[c]) * inv_a,
                    );
                }
                px[3] = 255;
            } else {
                px.copy_from_slice(&BACKGROUND);
            }
        }
        frame
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/demo.rs"]
mod tests;
