use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use super::{RenderError, WatermarkConfig};

/// Alpha used for the optional contrast halo, before the global opacity is
/// applied.
const HALO_ALPHA: u8 = 150;

/// Parse a hex (`#rrggbb`, `#rgb`) or named color into an opaque pixel.
pub fn parse_color(value: &str) -> Result<Rgba<u8>, RenderError> {
    let trimmed = value.trim();

    let named = match trimmed.to_ascii_lowercase().as_str() {
        "white" => Some([255, 255, 255]),
        "black" => Some([0, 0, 0]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "blue" => Some([0, 0, 255]),
        "yellow" => Some([255, 255, 0]),
        "cyan" => Some([0, 255, 255]),
        "magenta" => Some([255, 0, 255]),
        "gray" | "grey" => Some([128, 128, 128]),
        "orange" => Some([255, 165, 0]),
        _ => None,
    };
    if let Some([r, g, b]) = named {
        return Ok(Rgba([r, g, b, 255]));
    }

    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let expand = |c: u8| (c << 4) | c;
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16);
            let g = u8::from_str_radix(&hex[2..4], 16);
            let b = u8::from_str_radix(&hex[4..6], 16);
            match (r, g, b) {
                (Ok(r), Ok(g), Ok(b)) => Ok(Rgba([r, g, b, 255])),
                _ => Err(RenderError::InvalidColor(value.to_string())),
            }
        }
        3 => {
            let mut channels = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let digit = c
                    .to_digit(16)
                    .ok_or_else(|| RenderError::InvalidColor(value.to_string()))?;
                channels[i] = expand(digit as u8);
            }
            Ok(Rgba([channels[0], channels[1], channels[2], 255]))
        }
        _ => Err(RenderError::InvalidColor(value.to_string())),
    }
}

/// Rasterize the watermark text into a pre-rotated RGBA stamp.
///
/// The stamp is composited once per tile anchor, which keeps each tile's
/// transform independent of the next. Callers must not pass empty text.
pub(super) fn rasterize_stamp(
    font: &FontVec,
    config: &WatermarkConfig,
) -> Result<RgbaImage, RenderError> {
    let scale = PxScale::from(config.font_size_px as f32);
    let fill = parse_color(&config.color)?;

    let (text_width, text_height) = measure(font, scale, &config.text, config.letter_spacing_px);
    // Margin absorbs descenders, halo offsets and measurement slack
    let margin = config.font_size_px.max(2);
    let mut layer = RgbaImage::new(text_width + 2 * margin, text_height + 2 * margin);

    let origin = margin as i32;
    if config.outline {
        let halo = Rgba([0, 0, 0, HALO_ALPHA]);
        for (dx, dy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
            draw_run(
                &mut layer,
                halo,
                origin + dx,
                origin + dy,
                scale,
                font,
                &config.text,
                config.letter_spacing_px,
            );
        }
    }
    draw_run(
        &mut layer,
        Rgba([fill[0], fill[1], fill[2], 255]),
        origin,
        origin,
        scale,
        font,
        &config.text,
        config.letter_spacing_px,
    );

    let mut stamp = if config.rotation_degrees.rem_euclid(360) != 0 {
        rotate_expanded(&layer, (config.rotation_degrees as f32).to_radians())
    } else {
        layer
    };

    if config.opacity < 1.0 {
        for pixel in stamp.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * config.opacity).round() as u8;
        }
    }

    Ok(stamp)
}

/// Draw one glyph run, spreading glyphs by `letter_spacing` when non-zero.
#[allow(clippy::too_many_arguments)]
fn draw_run(
    layer: &mut RgbaImage,
    color: Rgba<u8>,
    x: i32,
    y: i32,
    scale: PxScale,
    font: &FontVec,
    text: &str,
    letter_spacing: f32,
) {
    if letter_spacing == 0.0 {
        draw_text_mut(layer, color, x, y, scale, font, text);
        return;
    }

    let mut cursor = x as f32;
    let mut buffer = [0u8; 4];
    for c in text.chars() {
        let glyph = c.encode_utf8(&mut buffer);
        draw_text_mut(layer, color, cursor.round() as i32, y, scale, font, glyph);
        let (advance, _) = text_size(scale, font, glyph);
        cursor += advance as f32 + letter_spacing;
    }
}

/// Text extents including letter spacing.
fn measure(font: &FontVec, scale: PxScale, text: &str, letter_spacing: f32) -> (u32, u32) {
    let (width, height) = text_size(scale, font, text);
    if letter_spacing == 0.0 {
        return (width, height);
    }

    let gaps = text.chars().count().saturating_sub(1) as f32;
    let spaced = width as f32 + gaps * letter_spacing;
    (spaced.ceil().max(0.0) as u32, height)
}

/// Rotate on a square canvas large enough to hold the diagonal, so corners
/// are never clipped.
fn rotate_expanded(layer: &RgbaImage, theta: f32) -> RgbaImage {
    let (width, height) = layer.dimensions();
    let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt().ceil() as u32;

    let mut padded = RgbaImage::new(diagonal, diagonal);
    image::imageops::replace(
        &mut padded,
        layer,
        ((diagonal - width) / 2) as i64,
        ((diagonal - height) / 2) as i64,
    );
    rotate_about_center(&padded, theta, Interpolation::Bilinear, Rgba([0, 0, 0, 0]))
}
