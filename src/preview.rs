use image::DynamicImage;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::formats::{self, EncodeError, EncodedImage, OutputFormat};
use crate::watermark::{RenderError, RenderSurface, Renderer, WatermarkConfig};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub struct LoadedImage {
    pub name: String,
    pub image: DynamicImage,
}

/// Owns the single loaded image, the on-screen surface and the current
/// configuration, and re-renders synchronously on every change.
///
/// No debouncing: a render is bounded by one image and completes well within
/// interactive latency.
pub struct PreviewController {
    renderer: Renderer,
    surface: RenderSurface,
    config: WatermarkConfig,
    image: Option<LoadedImage>,
}

impl PreviewController {
    pub fn new(renderer: Renderer, config: WatermarkConfig) -> Self {
        Self {
            renderer,
            surface: RenderSurface::new(),
            config,
            image: None,
        }
    }

    /// Export actions stay disabled until this returns true.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    /// Decode an image from disk and render it immediately.
    pub fn load_image(&mut self, path: &Path) -> Result<(), PreviewError> {
        let image = image::open(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        self.load_decoded(name, image)
    }

    /// Accept an already-decoded image (drag-and-drop style input).
    pub fn load_decoded(&mut self, name: String, image: DynamicImage) -> Result<(), PreviewError> {
        debug!("Loaded {} ({}x{})", name, image.width(), image.height());
        self.image = Some(LoadedImage { name, image });
        self.refresh()
    }

    /// Replace the configuration and re-render the loaded image, if any.
    pub fn set_config(&mut self, config: WatermarkConfig) -> Result<(), PreviewError> {
        config.validate()?;
        self.config = config;
        if self.image.is_some() {
            self.refresh()
        } else {
            Ok(())
        }
    }

    fn refresh(&mut self) -> Result<(), PreviewError> {
        let loaded = self.image.as_ref().ok_or(PreviewError::NoImageLoaded)?;
        self.renderer
            .render(&mut self.surface, &loaded.image, &self.config)?;
        Ok(())
    }

    /// Mirror the rendered surface into a savable artifact: PNG bytes with a
    /// timestamped filename.
    pub fn snapshot_png(&self) -> Result<EncodedImage, PreviewError> {
        if self.image.is_none() {
            return Err(PreviewError::NoImageLoaded);
        }

        let bytes = formats::png::encode(self.surface.buffer())?;
        Ok(EncodedImage {
            bytes,
            filename: format!("watermarked_{}.png", chrono::Utc::now().timestamp_millis()),
            format: OutputFormat::Png,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FontConfig;
    use crate::fonts::FontLibrary;
    use image::{Rgba, RgbaImage};

    fn controller() -> PreviewController {
        let renderer = Renderer::new(FontLibrary::new(FontConfig {
            directories: Vec::new(),
            default_font: None,
        }));
        let config = WatermarkConfig {
            text: String::new(),
            ..Default::default()
        };
        PreviewController::new(renderer, config)
    }

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([50, 60, 70, 255])))
    }

    #[test]
    fn test_load_renders_at_source_dimensions() {
        let mut preview = controller();
        assert!(!preview.has_image());

        preview
            .load_decoded("photo.png".to_string(), test_image(120, 80))
            .unwrap();
        assert!(preview.has_image());
        assert_eq!(preview.surface().width(), 120);
        assert_eq!(preview.surface().height(), 80);
    }

    #[test]
    fn test_config_change_rerenders() {
        let mut preview = controller();
        preview
            .load_decoded("photo.png".to_string(), test_image(60, 60))
            .unwrap();

        let new_config = WatermarkConfig {
            text: String::new(),
            grid_rows: 2,
            grid_cols: 2,
            ..Default::default()
        };
        preview.set_config(new_config.clone()).unwrap();
        assert_eq!(preview.config(), &new_config);
    }

    #[test]
    fn test_config_change_without_image_is_accepted() {
        let mut preview = controller();
        let config = WatermarkConfig {
            text: String::new(),
            opacity: 0.5,
            ..Default::default()
        };
        preview.set_config(config).unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut preview = controller();
        let config = WatermarkConfig {
            grid_rows: 0,
            ..Default::default()
        };
        assert!(matches!(
            preview.set_config(config),
            Err(PreviewError::Render(RenderError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_snapshot_requires_image() {
        let preview = controller();
        assert!(matches!(
            preview.snapshot_png(),
            Err(PreviewError::NoImageLoaded)
        ));
    }

    #[test]
    fn test_snapshot_encodes_current_surface() {
        let mut preview = controller();
        preview
            .load_decoded("photo.png".to_string(), test_image(32, 24))
            .unwrap();

        let snapshot = preview.snapshot_png().unwrap();
        assert!(snapshot.filename.starts_with("watermarked_"));
        assert!(snapshot.filename.ends_with(".png"));
        assert_eq!(snapshot.format, OutputFormat::Png);
        assert!(snapshot.bytes.starts_with(b"\x89PNG\r\n\x1a\n"));

        let decoded = image::load_from_memory(&snapshot.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }
}
