use serde::{Deserialize, Serialize};

use super::RenderError;

/// Immutable watermark parameters consumed per render call.
///
/// Rotation is stored in degrees and only converted to radians inside the
/// renderer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub text: String,
    /// Hex (`#rrggbb`) or named color
    pub color: String,
    /// Global alpha in [0, 1]
    pub opacity: f32,
    pub font_size_px: u32,
    pub rotation_degrees: i32,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub font_family: String,
    /// Weight name ("bold") or numeric string ("800")
    pub font_weight: String,
    pub letter_spacing_px: f32,
    /// Offset alternating rows by half a cell, like brick courses
    pub staggered: bool,
    /// Draw a dark four-direction halo behind the text for contrast
    pub outline: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "CONFIDENTIAL".to_string(),
            color: "#ffffff".to_string(),
            opacity: 0.1,
            font_size_px: 14,
            rotation_degrees: -22,
            grid_rows: 10,
            grid_cols: 6,
            font_family: "DejaVuSans".to_string(),
            font_weight: "regular".to_string(),
            letter_spacing_px: 0.0,
            staggered: true,
            outline: false,
        }
    }
}

impl WatermarkConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.grid_rows < 1 {
            return Err(RenderError::InvalidConfig("grid_rows must be >= 1".into()));
        }
        if self.grid_cols < 1 {
            return Err(RenderError::InvalidConfig("grid_cols must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(RenderError::InvalidConfig(
                "opacity must be within [0, 1]".into(),
            ));
        }
        if self.font_size_px == 0 {
            return Err(RenderError::InvalidConfig(
                "font_size_px must be positive".into(),
            ));
        }
        Ok(())
    }
}
