use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::Config;
use crate::fonts::FontLibrary;

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create export directory: {0}")]
    ExportDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Batch source directory does not exist: {0}")]
    SourceDirectoryMissing(String),

    #[error("No font found for family '{0}' weight '{1}'")]
    NoFontAvailable(String, String),
}

impl StartupCheckError {
    /// Errors that make the requested run impossible.
    pub fn is_critical(&self, config: &Config) -> bool {
        match self {
            StartupCheckError::ExportDirectoryCreationFailed(_) => true,
            StartupCheckError::SourceDirectoryMissing(_) => true,
            // A missing font only matters when there is text to draw
            StartupCheckError::NoFontAvailable(_, _) => !config.watermark.text.is_empty(),
        }
    }
}

pub async fn perform_startup_checks(
    config: &Config,
    source_directory: Option<&Path>,
) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    for directory in [
        &config.export.downloads_directory,
        &config.export.gallery_directory,
    ] {
        if !directory.exists() {
            info!("Export directory does not exist, creating: {:?}", directory);
            if let Err(e) = tokio::fs::create_dir_all(directory).await {
                error!("Failed to create export directory {:?}: {}", directory, e);
                errors.push(StartupCheckError::ExportDirectoryCreationFailed(e));
            }
        } else {
            info!("Export directory exists: {:?}", directory);
        }
    }

    for directory in &config.fonts.directories {
        if !directory.exists() {
            warn!("Font directory does not exist: {:?}", directory);
        }
    }

    let library = FontLibrary::new(config.fonts.clone());
    let family = &config.watermark.font_family;
    let weight = &config.watermark.font_weight;
    match library.locate(family, weight) {
        Some(path) => info!("Watermark font resolved: {:?}", path),
        None => {
            warn!("No font found for family '{}' weight '{}'", family, weight);
            errors.push(StartupCheckError::NoFontAvailable(
                family.clone(),
                weight.clone(),
            ));
        }
    }

    if let Some(source) = source_directory
        && !source.exists()
    {
        error!("Batch source directory does not exist: {:?}", source);
        errors.push(StartupCheckError::SourceDirectoryMissing(
            source.display().to_string(),
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
