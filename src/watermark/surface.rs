use image::{Rgba, RgbaImage};

/// Reusable drawing target for renders.
///
/// Safe to reuse across renders because `prepare` always resizes, clears and
/// fully redraws the buffer before any tile is composited.
#[derive(Debug, Default)]
pub struct RenderSurface {
    buffer: RgbaImage,
}

impl RenderSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to exactly the given dimensions and clear to transparent.
    pub fn prepare(&mut self, width: u32, height: u32) {
        if self.buffer.dimensions() != (width, height) {
            self.buffer = RgbaImage::new(width, height);
        } else {
            for pixel in self.buffer.pixels_mut() {
                *pixel = Rgba([0, 0, 0, 0]);
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut RgbaImage {
        &mut self.buffer
    }
}
