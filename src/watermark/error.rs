use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid watermark config: {0}")]
    InvalidConfig(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("No font found for family '{family}' weight '{weight}'")]
    FontNotFound { family: String, weight: String },

    #[error("Failed to parse font file {0}")]
    FontParse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}
