use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::formats::EncodedImage;

/// Platform capability provider. Injected so routing decisions are testable
/// without inspecting the real environment.
pub trait PlatformProbe: Send + Sync {
    /// Whether the runtime targets a touch-first platform.
    fn is_touch_first(&self) -> bool;
}

/// Probe with a fixed answer, fed from configuration or CLI flags.
#[derive(Debug, Clone)]
pub struct StaticPlatform {
    touch_first: bool,
}

impl StaticPlatform {
    pub fn new(touch_first: bool) -> Self {
        Self { touch_first }
    }
}

impl PlatformProbe for StaticPlatform {
    fn is_touch_first(&self) -> bool {
        self.touch_first
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub filename: String,
    pub mime_type: String,
    pub added_at: chrono::DateTime<chrono::Utc>,
}

/// Routes rendered images to a per-platform delivery target.
///
/// Desktop-class platforms get a one-shot save into the downloads directory.
/// Touch-first platforms get the image appended to a gallery page users can
/// save from manually.
pub struct ExportRouter {
    platform: Arc<dyn PlatformProbe>,
    downloads_dir: PathBuf,
    gallery_dir: PathBuf,
    gallery: Mutex<Vec<GalleryEntry>>,
}

impl ExportRouter {
    pub fn new(platform: Arc<dyn PlatformProbe>, downloads_dir: PathBuf, gallery_dir: PathBuf) -> Self {
        Self {
            platform,
            downloads_dir,
            gallery_dir,
            gallery: Mutex::new(Vec::new()),
        }
    }

    pub fn is_touch_first(&self) -> bool {
        self.platform.is_touch_first()
    }

    /// Deliver one encoded image, returning the path it was written to.
    pub async fn deliver(&self, image: &EncodedImage) -> Result<PathBuf, ExportError> {
        if self.platform.is_touch_first() {
            self.deliver_to_gallery(image).await
        } else {
            self.deliver_download(image).await
        }
    }

    /// Final status guidance shown when a batch completes.
    pub fn completion_guidance(&self) -> &'static str {
        if self.platform.is_touch_first() {
            "Done. Long-press the images on the gallery page to save them."
        } else {
            "Done. Check your downloads folder."
        }
    }

    async fn deliver_download(&self, image: &EncodedImage) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.downloads_dir).await?;
        let path = unique_path(&self.downloads_dir, &image.filename).await?;
        tokio::fs::write(&path, &image.bytes).await?;
        debug!("Delivered {} bytes to {:?}", image.bytes.len(), path);
        Ok(path)
    }

    async fn deliver_to_gallery(&self, image: &EncodedImage) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.gallery_dir).await?;
        let path = unique_path(&self.gallery_dir, &image.filename).await?;
        tokio::fs::write(&path, &image.bytes).await?;

        let mut gallery = self.gallery.lock().await;
        gallery.push(GalleryEntry {
            filename: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&image.filename)
                .to_string(),
            mime_type: image.format.mime_type().to_string(),
            added_at: chrono::Utc::now(),
        });

        // The gallery page is best-effort; the image file itself stays
        // directly openable if the page cannot be written.
        if let Err(e) = self.rewrite_gallery_page(&gallery).await {
            warn!("Failed to update gallery page: {}", e);
        }

        Ok(path)
    }

    async fn rewrite_gallery_page(&self, entries: &[GalleryEntry]) -> Result<(), ExportError> {
        let manifest = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(self.gallery_dir.join("gallery.json"), manifest).await?;

        let mut figures = String::new();
        for entry in entries {
            figures.push_str(&format!(
                "    <figure><img src=\"{name}\" alt=\"{name}\"><figcaption>{name}</figcaption></figure>\n",
                name = entry.filename
            ));
        }
        let page = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><meta name=\"viewport\" \
             content=\"width=device-width, initial-scale=1\"><title>Watermarked images</title></head>\n\
             <body>\n  <h1>Watermarked images</h1>\n  <p>Long-press an image and choose \
             \"Save image\" to keep it.</p>\n  <main>\n{figures}  </main>\n</body>\n</html>\n"
        );
        tokio::fs::write(self.gallery_dir.join("index.html"), page).await?;
        Ok(())
    }
}

/// Pick a non-colliding path in `dir`, suffixing ` (1)`, ` (2)`, ... the way
/// desktop browsers name repeated downloads.
async fn unique_path(dir: &Path, filename: &str) -> Result<PathBuf, ExportError> {
    let candidate = dir.join(filename);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let extension = Path::new(filename).extension().and_then(|s| s.to_str());

    let mut n = 1u32;
    loop {
        let name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}
