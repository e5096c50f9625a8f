//! Archive downloader for registry packages and release assets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::archive::{self, ArchiveFormat};
use crate::http::HttpClient;
use crate::{Result, TpixError};

use super::progress::{DownloadHandle, DownloadProgress, ProgressUpdate, PROGRESS_CHANNEL_CAPACITY};

/// Callback run inside the download task once the payload is extracted.
///
/// Receives the destination directory. An error it returns becomes the
/// download's error.
pub type OnFinished = Box<dyn FnOnce(&Path) -> Result<()> + Send + 'static>;

/// A downloadable archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// File name; its suffix selects the archive format
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    /// Announced size in bytes, 0 or negative when unknown
    pub size: i64,
}

impl ReleaseAsset {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>, size: i64) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
            size,
        }
    }

    fn announced_size(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }
}

/// Downloads one asset at a time in a background task
#[derive(Clone)]
pub struct Downloader {
    http_client: Arc<HttpClient>,
}

impl Downloader {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    /// Start downloading `asset` and extracting it into `dest_dir`.
    ///
    /// Returns immediately. Must be called from within a Tokio runtime.
    ///
    /// The body is streamed to a temporary file in `dest_dir`. When the asset
    /// announces a size, receiving any other byte count fails with
    /// [`TpixError::SizeMismatch`]. On a complete transfer the archive is
    /// extracted into `dest_dir`, the temporary file is removed and then
    /// `on_finished` runs. It does not run if any earlier step failed.
    pub fn download(
        &self,
        asset: ReleaseAsset,
        dest_dir: impl Into<PathBuf>,
        on_finished: Option<OnFinished>,
    ) -> DownloadHandle {
        let dest_dir = dest_dir.into();
        let progress = Arc::new(DownloadProgress::new(asset.announced_size()));
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);

        let client = Arc::clone(&self.http_client);
        let task_progress = Arc::clone(&progress);
        let task_dest = dest_dir.clone();

        // `tx` moves into the task and is dropped when it returns, which
        // closes the channel on every exit path.
        let task = tokio::spawn(async move {
            let result = run_download(client, asset, task_dest, task_progress, tx, on_finished).await;
            if let Err(e) = &result {
                log::debug!("Download failed: {}", e);
            }
            result
        });

        DownloadHandle::new(progress, rx, task, dest_dir)
    }
}

async fn run_download(
    client: Arc<HttpClient>,
    asset: ReleaseAsset,
    dest_dir: PathBuf,
    progress: Arc<DownloadProgress>,
    tx: mpsc::Sender<ProgressUpdate>,
    on_finished: Option<OnFinished>,
) -> Result<u64> {
    log::debug!("Downloading {} from {}", asset.name, asset.download_url);

    let response = client.get(&asset.download_url).await?;

    if progress.total() == 0 {
        if let Some(length) = response.content_length() {
            progress.set_total(length);
        }
    }

    tokio::fs::create_dir_all(&dest_dir).await?;
    let part_path = dest_dir.join(part_file_name(&asset.name));
    let mut file = tokio::fs::File::create(&part_path).await?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;

        let received = progress.add(chunk.len() as u64);
        let update = ProgressUpdate {
            received,
            total: progress.total(),
        };
        // A dropped receiver only means nobody is watching
        let _ = tx.send(update).await;
    }

    file.flush().await?;
    drop(file);

    let expected = progress.total();
    let received = progress.received();
    if expected > 0 && received != expected {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(TpixError::SizeMismatch {
            expected,
            actual: received,
        });
    }

    let format = ArchiveFormat::detect(&asset.name);
    let extract_dir = dest_dir.clone();
    let archive_path = part_path.clone();
    let extracted = tokio::task::spawn_blocking(move || {
        archive::extract(format, &archive_path, &extract_dir)
    })
    .await
    .map_err(|e| {
        TpixError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("extraction task failed: {}", e),
        ))
    })?;

    if let Err(e) = tokio::fs::remove_file(&part_path).await {
        log::warn!("Failed to remove {}: {}", part_path.display(), e);
    }
    extracted?;

    log::debug!("Extracted {} into {}", asset.name, dest_dir.display());

    if let Some(callback) = on_finished {
        callback(&dest_dir)?;
    }

    Ok(received)
}

/// Name of the temporary file the body is streamed into
fn part_file_name(asset_name: &str) -> String {
    let base = Path::new(asset_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    format!(".{}.part", base)
}
