use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::export::{ExportError, ExportRouter};
use crate::formats::{self, EncodeError, EncodedImage, OutputFormat};
use crate::watermark::{RenderError, RenderSurface, Renderer, WatermarkConfig};

/// Pauses between pipeline steps. These exist to avoid overwhelming the
/// delivery target, not for render correctness, and are tunable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacingConfig {
    /// Pause after triggering an export
    pub post_export_ms: u64,
    /// Pause after updating progress
    pub post_progress_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            post_export_ms: 100,
            post_progress_ms: 400,
        }
    }
}

/// When the watermark configuration is sampled during a batch run.
///
/// `PerItem` re-reads the live configuration before each item (last write
/// wins mid-batch); `AtStart` freezes it when the run begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    #[default]
    PerItem,
    AtStart,
}

/// One queued batch input: the original filename plus where to decode it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    pub name: String,
    pub path: PathBuf,
}

impl QueuedFile {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self { name, path })
    }
}

/// Collect image files under `dir` in a deterministic order.
pub fn scan_directory(dir: &Path) -> Vec<QueuedFile> {
    let mut files: Vec<QueuedFile> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            mime_guess::from_path(entry.path())
                .first()
                .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
                .unwrap_or(false)
        })
        .filter_map(|entry| QueuedFile::from_path(entry.into_path()))
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Receives status updates during a batch run.
pub trait ProgressObserver: Send + Sync {
    fn on_item_started(&self, _position: usize, _total: usize, _name: &str) {}
    fn on_progress(&self, _percent: f32) {}
    fn on_finished(&self, _summary: &BatchSummary, _guidance: &str) {}
}

/// Tracing-backed observer used by the CLI.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_item_started(&self, position: usize, total: usize, name: &str) {
        info!("Processing ({}/{}): {}", position, total, name);
    }

    fn on_progress(&self, percent: f32) {
        info!("Progress: {:.0}%", percent);
    }

    fn on_finished(&self, summary: &BatchSummary, guidance: &str) {
        if summary.cancelled {
            info!(
                "Batch cancelled after {} of {} images",
                summary.delivered, summary.total
            );
        } else {
            info!(
                "Batch finished: {} delivered, {} skipped. {}",
                summary.delivered,
                summary.skipped.len(),
                guidance
            );
        }
        for skipped in &summary.skipped {
            warn!("Skipped {}: {}", skipped.name, skipped.reason);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub delivered: usize,
    pub skipped: Vec<SkippedFile>,
    pub cancelled: bool,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("A batch is already running")]
    AlreadyRunning,

    #[error("No images selected")]
    EmptySelection,

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

struct RenderState {
    renderer: Renderer,
    surface: RenderSurface,
}

/// Sequential, single-flight batch processor.
///
/// Items are processed strictly one at a time on the reusable offscreen
/// surface; CPU-bound decode/render/encode steps run on blocking threads and
/// the pacing pauses between steps keep status output flowing.
pub struct BatchPipeline {
    state: Arc<Mutex<RenderState>>,
    config: Arc<RwLock<WatermarkConfig>>,
    output_format: OutputFormat,
    jpeg_quality: u8,
    pacing: PacingConfig,
    snapshot_policy: SnapshotPolicy,
    running: AtomicBool,
}

/// Releases the single-flight flag on all exit paths.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchPipeline {
    pub fn new(renderer: Renderer, watermark: WatermarkConfig, batch: crate::BatchConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RenderState {
                renderer,
                surface: RenderSurface::new(),
            })),
            config: Arc::new(RwLock::new(watermark)),
            output_format: batch.output_format,
            jpeg_quality: batch.jpeg_quality,
            pacing: batch.pacing,
            snapshot_policy: batch.snapshot_policy,
            running: AtomicBool::new(false),
        }
    }

    /// Handle to the live watermark configuration. Edits land before the next
    /// item under the per-item snapshot policy.
    pub fn config(&self) -> Arc<RwLock<WatermarkConfig>> {
        Arc::clone(&self.config)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Process every queued file in order, delivering each result through the
    /// router and reporting exactly one progress update per item.
    ///
    /// Decode failures are skipped and logged; they still count toward
    /// progress. Render and export failures abort the run since they would
    /// repeat for every remaining item.
    pub async fn process_batch(
        &self,
        files: Vec<QueuedFile>,
        router: &ExportRouter,
        observer: &dyn ProgressObserver,
        cancel: CancellationToken,
    ) -> Result<BatchSummary, BatchError> {
        if files.is_empty() {
            return Err(BatchError::EmptySelection);
        }

        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| BatchError::AlreadyRunning)?;
        let _guard = RunGuard(&self.running);

        let total = files.len();
        let mut summary = BatchSummary {
            total,
            ..Default::default()
        };

        let frozen_config = match self.snapshot_policy {
            SnapshotPolicy::AtStart => Some(self.config.read().await.clone()),
            SnapshotPolicy::PerItem => None,
        };

        for (index, file) in files.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let position = index + 1;
            observer.on_item_started(position, total, &file.name);

            let path = file.path.clone();
            let decoded = tokio::task::spawn_blocking(move || image::open(path)).await?;
            match decoded {
                Ok(image) => {
                    let config = match &frozen_config {
                        Some(config) => config.clone(),
                        None => self.config.read().await.clone(),
                    };
                    let encoded = self.render_and_encode(image, config, &file.name).await?;

                    router.deliver(&encoded).await?;
                    summary.delivered += 1;
                    sleep(Duration::from_millis(self.pacing.post_export_ms)).await;
                }
                Err(e) => {
                    warn!("Failed to decode {}, skipping: {}", file.name, e);
                    summary.skipped.push(SkippedFile {
                        name: file.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            let percent = (position as f32 / total as f32) * 100.0;
            observer.on_progress(percent);
            sleep(Duration::from_millis(self.pacing.post_progress_ms)).await;
        }

        observer.on_finished(&summary, router.completion_guidance());
        Ok(summary)
    }

    async fn render_and_encode(
        &self,
        image: image::DynamicImage,
        config: WatermarkConfig,
        original_name: &str,
    ) -> Result<EncodedImage, BatchError> {
        let state = Arc::clone(&self.state);
        let format = self.output_format;
        let quality = self.jpeg_quality;

        let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, BatchError> {
            let mut state = state.blocking_lock();
            let RenderState { renderer, surface } = &mut *state;
            renderer.render(surface, &image, &config)?;
            let bytes = formats::encode(surface.buffer(), format, quality)?;
            debug!("Encoded {} bytes as {:?}", bytes.len(), format);
            Ok(bytes)
        })
        .await??;

        Ok(EncodedImage {
            bytes,
            filename: formats::output_filename(original_name, format),
            format,
        })
    }
}
