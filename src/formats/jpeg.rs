use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

use super::EncodeError;

/// Encode a surface as JPEG bytes at the given quality.
///
/// JPEG has no alpha channel, so the surface is flattened to RGB first.
pub fn encode(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}
