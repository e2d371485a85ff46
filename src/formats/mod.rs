// Output encoding - turns rendered surfaces into PNG or JPEG byte streams
pub mod jpeg;
pub mod png;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Encoded raster plus a suggested filename; produced fresh per render and
/// immediately consumed by export, never cached.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub format: OutputFormat,
}

/// Encode a rendered surface in the requested format.
pub fn encode(
    image: &RgbaImage,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    match format {
        OutputFormat::Png => png::encode(image),
        OutputFormat::Jpeg => jpeg::encode(image, jpeg_quality),
    }
}

/// Derive the export filename: strip the original extension, prefix with
/// `watermarked_`, append the output format's extension.
pub fn output_filename(original_name: &str, format: OutputFormat) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original_name);
    format!("watermarked_{}.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_extensions_and_mime_types() {
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_output_filename_strips_extension() {
        assert_eq!(
            output_filename("holiday.jpeg", OutputFormat::Png),
            "watermarked_holiday.png"
        );
        assert_eq!(
            output_filename("scan.png", OutputFormat::Jpeg),
            "watermarked_scan.jpg"
        );
    }

    #[test]
    fn test_output_filename_without_extension() {
        assert_eq!(
            output_filename("photo", OutputFormat::Png),
            "watermarked_photo.png"
        );
    }

    #[test]
    fn test_output_filename_keeps_inner_dots() {
        assert_eq!(
            output_filename("trip.2024.summer.jpg", OutputFormat::Png),
            "watermarked_trip.2024.summer.png"
        );
    }

    #[test]
    fn test_encode_png_round_trips_dimensions() {
        let image = RgbaImage::from_pixel(37, 21, Rgba([12, 34, 56, 255]));
        let bytes = encode(&image, OutputFormat::Png, 95).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (37, 21));
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let image = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 128]));
        let bytes = encode(&image, OutputFormat::Jpeg, 95).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
        assert!(!decoded.color().has_alpha());
    }
}
