// Watermark rendering - tiled, rotated text composited over a source image
mod error;
mod stamp;
mod surface;
mod tiling;
mod types;

pub use error::RenderError;
pub use stamp::parse_color;
pub use surface::RenderSurface;
pub use tiling::{TileAnchor, TileLayout};
pub use types::WatermarkConfig;

use image::DynamicImage;
use tracing::debug;

use crate::fonts::FontLibrary;

/// Renders a watermark grid onto a caller-provided surface.
pub struct Renderer {
    fonts: FontLibrary,
}

impl Renderer {
    pub fn new(fonts: FontLibrary) -> Self {
        Self { fonts }
    }

    /// Composite `image` and the tiled watermark onto `surface`.
    ///
    /// The surface is resized to exactly the source dimensions, cleared and
    /// redrawn, so output resolution always matches input resolution. Empty
    /// text copies the base image and draws nothing.
    pub fn render(
        &mut self,
        surface: &mut RenderSurface,
        image: &DynamicImage,
        config: &WatermarkConfig,
    ) -> Result<(), RenderError> {
        config.validate()?;

        surface.prepare(image.width(), image.height());
        image::imageops::replace(surface.buffer_mut(), &image.to_rgba8(), 0, 0);

        if config.text.is_empty() {
            return Ok(());
        }

        let font = self.fonts.resolve(&config.font_family, &config.font_weight)?;
        let stamp = stamp::rasterize_stamp(font, config)?;

        let layout = TileLayout::new(surface.width(), surface.height(), config);
        let half_width = (stamp.width() / 2) as i64;
        let half_height = (stamp.height() / 2) as i64;

        let mut tiles = 0usize;
        for anchor in layout.anchors() {
            image::imageops::overlay(
                surface.buffer_mut(),
                &stamp,
                anchor.x.round() as i64 - half_width,
                anchor.y.round() as i64 - half_height,
            );
            tiles += 1;
        }
        debug!(
            "Rendered {} tiles over {}x{} image",
            tiles,
            surface.width(),
            surface.height()
        );

        Ok(())
    }
}
