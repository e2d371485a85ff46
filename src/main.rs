use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use sukashi::batch::{LogProgress, scan_directory};
use sukashi::export::StaticPlatform;
use sukashi::fonts::FontLibrary;
use sukashi::preview::PreviewController;
use sukashi::{
    BatchPipeline, Config, ExportRouter, OutputFormat, Renderer, WatermarkConfig, startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watermark a single image and export a PNG snapshot
    Preview {
        image: PathBuf,

        /// Write the snapshot here instead of the downloads directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        watermark: WatermarkArgs,
    },

    /// Watermark every image in a directory
    Batch {
        directory: PathBuf,

        /// Route exports to the gallery page instead of the downloads directory
        #[arg(long)]
        touch_first: bool,

        /// Output format: png or jpeg
        #[arg(long, value_parser = parse_format)]
        format: Option<OutputFormat>,

        #[command(flatten)]
        watermark: WatermarkArgs,
    },
}

/// Live configuration surface; each flag overrides the config file field.
#[derive(Args, Debug)]
struct WatermarkArgs {
    #[arg(long)]
    text: Option<String>,

    /// Hex (#rrggbb) or named color
    #[arg(long)]
    color: Option<String>,

    /// Opacity in [0, 1]
    #[arg(long)]
    opacity: Option<f32>,

    /// Font size in pixels
    #[arg(long)]
    font_size: Option<u32>,

    /// Rotation in degrees
    #[arg(long)]
    rotation: Option<i32>,

    #[arg(long)]
    rows: Option<u32>,

    #[arg(long)]
    cols: Option<u32>,

    #[arg(long)]
    font_family: Option<String>,

    #[arg(long)]
    font_weight: Option<String>,

    /// Extra spacing between glyphs in pixels
    #[arg(long)]
    letter_spacing: Option<f32>,

    /// Offset alternating rows by half a cell
    #[arg(long)]
    staggered: Option<bool>,

    /// Draw a dark halo behind the text
    #[arg(long)]
    outline: Option<bool>,
}

impl WatermarkArgs {
    fn apply(&self, config: &mut WatermarkConfig) {
        if let Some(text) = &self.text {
            config.text = text.clone();
        }
        if let Some(color) = &self.color {
            config.color = color.clone();
        }
        if let Some(opacity) = self.opacity {
            config.opacity = opacity;
        }
        if let Some(font_size) = self.font_size {
            config.font_size_px = font_size;
        }
        if let Some(rotation) = self.rotation {
            config.rotation_degrees = rotation;
        }
        if let Some(rows) = self.rows {
            config.grid_rows = rows;
        }
        if let Some(cols) = self.cols {
            config.grid_cols = cols;
        }
        if let Some(family) = &self.font_family {
            config.font_family = family.clone();
        }
        if let Some(weight) = &self.font_weight {
            config.font_weight = weight.clone();
        }
        if let Some(spacing) = self.letter_spacing {
            config.letter_spacing_px = spacing;
        }
        if let Some(staggered) = self.staggered {
            config.staggered = staggered;
        }
        if let Some(outline) = self.outline {
            config.outline = outline;
        }
    }
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "png" => Ok(OutputFormat::Png),
        "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
        other => Err(format!("unknown format '{}', expected png or jpeg", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Preview {
            image,
            output,
            watermark,
        } => run_preview(config, image, output, watermark).await,
        Commands::Batch {
            directory,
            touch_first,
            format,
            watermark,
        } => run_batch(config, directory, touch_first, format, watermark).await,
    }
}

fn load_config(path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = toml_edit::de::from_str::<Config>(&content)?;
        info!("Configuration loaded from: {:?}", path);
        Ok(config)
    } else {
        info!("Config file not found at {:?}, using defaults", path);
        Ok(Config::default())
    }
}

async fn run_preview(
    mut config: Config,
    image: PathBuf,
    output: Option<PathBuf>,
    watermark: WatermarkArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    watermark.apply(&mut config.watermark);
    check_startup(&config, None).await?;

    let renderer = Renderer::new(FontLibrary::new(config.fonts.clone()));
    let mut preview = PreviewController::new(renderer, config.watermark.clone());
    preview.load_image(&image)?;

    let snapshot = preview.snapshot_png()?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, &snapshot.bytes).await?;
            info!("Wrote preview to {:?}", path);
        }
        None => {
            let platform = Arc::new(StaticPlatform::new(config.export.touch_first));
            let router = ExportRouter::new(
                platform,
                config.export.downloads_directory.clone(),
                config.export.gallery_directory.clone(),
            );
            let path = router.deliver(&snapshot).await?;
            info!("Wrote preview to {:?}", path);
        }
    }

    Ok(())
}

async fn run_batch(
    mut config: Config,
    directory: PathBuf,
    touch_first: bool,
    format: Option<OutputFormat>,
    watermark: WatermarkArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    watermark.apply(&mut config.watermark);
    if touch_first {
        config.export.touch_first = true;
    }
    if let Some(format) = format {
        config.batch.output_format = format;
    }

    check_startup(&config, Some(&directory)).await?;

    let files = scan_directory(&directory);
    if files.is_empty() {
        return Err(format!("No images found in {:?}", directory).into());
    }
    info!("Found {} images in {:?}", files.len(), directory);

    let renderer = Renderer::new(FontLibrary::new(config.fonts.clone()));
    let pipeline = BatchPipeline::new(renderer, config.watermark.clone(), config.batch.clone());
    let platform = Arc::new(StaticPlatform::new(config.export.touch_first));
    let router = ExportRouter::new(
        platform,
        config.export.downloads_directory.clone(),
        config.export.gallery_directory.clone(),
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Cancellation requested (Ctrl+C)");
            signal_cancel.cancel();
        }
    });

    let summary = pipeline
        .process_batch(files, &router, &LogProgress, cancel)
        .await?;

    if summary.cancelled {
        info!(
            "Cancelled: {} of {} images delivered",
            summary.delivered, summary.total
        );
    }

    Ok(())
}

async fn check_startup(
    config: &Config,
    source_directory: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match startup_checks::perform_startup_checks(config, source_directory).await {
        Ok(()) => {
            info!("All startup checks passed");
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }
            if errors.iter().any(|e| e.is_critical(config)) {
                Err("Critical startup check failed".into())
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
                Ok(())
            }
        }
    }
}
