use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod batch;
pub mod export;
pub mod fonts;
pub mod formats;
pub mod preview;
pub mod startup_checks;
pub mod watermark;

pub use batch::{BatchPipeline, PacingConfig, SnapshotPolicy};
pub use export::ExportRouter;
pub use formats::OutputFormat;
pub use watermark::{Renderer, WatermarkConfig};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FontConfig {
    /// Directories searched for font files, in order
    pub directories: Vec<PathBuf>,
    /// Font used when (family, weight) cannot be resolved
    #[serde(default)]
    pub default_font: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    pub downloads_directory: PathBuf,
    pub gallery_directory: PathBuf,
    /// Route exports to the gallery page instead of the downloads directory
    #[serde(default)]
    pub touch_first: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub snapshot_policy: SnapshotPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Sukashi".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            directories: vec![
                PathBuf::from("fonts"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu"),
            ],
            default_font: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            downloads_directory: PathBuf::from("downloads"),
            gallery_directory: PathBuf::from("gallery"),
            touch_first: false,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Png,
            jpeg_quality: 95,
            pacing: PacingConfig::default(),
            snapshot_policy: SnapshotPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.app.name, "Sukashi");
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.batch.jpeg_quality, 95);
        assert_eq!(config.batch.output_format, OutputFormat::Png);
        assert!(!config.export.touch_first);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let serialized = toml_edit::ser::to_string(&config).unwrap();
        let parsed: Config = toml_edit::de::from_str(&serialized).unwrap();
        assert_eq!(parsed.app.name, config.app.name);
        assert_eq!(parsed.watermark.text, config.watermark.text);
        assert_eq!(parsed.batch.output_format, config.batch.output_format);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[app]
name = "custom"
log_level = "debug"

[watermark]
text = "DRAFT"
"#;
        let config: Config = toml_edit::de::from_str(toml).unwrap();
        assert_eq!(config.app.name, "custom");
        assert_eq!(config.watermark.text, "DRAFT");
        // Unspecified watermark fields fall back to field defaults
        assert_eq!(config.watermark.grid_rows, 10);
        assert_eq!(
            config.export.downloads_directory,
            PathBuf::from("downloads")
        );
    }
}
