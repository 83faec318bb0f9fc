use crate::foundation::error::{FramecapError, FramecapResult};

/// A rendered host surface as RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// A fully transparent frame.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
            premultiplied: true,
        }
    }

    /// Check that the buffer matches the stated dimensions.
    pub fn validate(&self) -> FramecapResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FramecapError::validation("frame width/height must be non-zero"));
        }
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| FramecapError::validation("frame dimensions overflow"))?;
        if self.data.len() != expected {
            return Err(FramecapError::validation(format!(
                "frame data is {} bytes, expected {expected} for {}x{}",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}
