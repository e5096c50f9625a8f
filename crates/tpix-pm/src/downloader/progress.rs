//! Download progress state and the consumer-side handle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{Result, TpixError};

/// Capacity of the progress channel
pub const PROGRESS_CHANNEL_CAPACITY: usize = 5;

/// Byte counters shared between the download task and its handle
#[derive(Debug, Default)]
pub struct DownloadProgress {
    received: AtomicU64,
    total: AtomicU64,
}

impl DownloadProgress {
    pub(crate) fn new(total: u64) -> Self {
        Self {
            received: AtomicU64::new(0),
            total: AtomicU64::new(total),
        }
    }

    /// Record `n` more bytes and return the new running total
    pub(crate) fn add(&self, n: u64) -> u64 {
        self.received.fetch_add(n, Ordering::SeqCst) + n
    }

    pub(crate) fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }

    /// Announced size in bytes, 0 when unknown
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            received: self.received(),
            total: self.total(),
        }
    }
}

/// One progress report, sent after every write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub received: u64,
    pub total: u64,
}

impl ProgressUpdate {
    /// Fraction of the announced size received so far.
    ///
    /// `None` when the size is unknown.
    pub fn ratio(&self) -> Option<f32> {
        if self.total == 0 {
            None
        } else {
            Some(self.received as f32 / self.total as f32)
        }
    }
}

/// Handle to a running download.
///
/// Read updates with [`next`](Self::next) until it returns `None`, then call
/// [`finish`](Self::finish) for the outcome. `finish` drains any remaining
/// updates itself, so it is also fine to call it directly.
pub struct DownloadHandle {
    progress: Arc<DownloadProgress>,
    updates: mpsc::Receiver<ProgressUpdate>,
    task: JoinHandle<Result<u64>>,
    dest_dir: PathBuf,
}

impl DownloadHandle {
    pub(crate) fn new(
        progress: Arc<DownloadProgress>,
        updates: mpsc::Receiver<ProgressUpdate>,
        task: JoinHandle<Result<u64>>,
        dest_dir: PathBuf,
    ) -> Self {
        Self {
            progress,
            updates,
            task,
            dest_dir,
        }
    }

    /// Wait for the next progress update; `None` once the download has ended
    pub async fn next(&mut self) -> Option<ProgressUpdate> {
        self.updates.recv().await
    }

    pub fn progress(&self) -> &DownloadProgress {
        &self.progress
    }

    pub fn dest_dir(&self) -> &std::path::Path {
        &self.dest_dir
    }

    /// Wait for the download task and return the number of bytes received
    pub async fn finish(mut self) -> Result<u64> {
        while self.updates.recv().await.is_some() {}

        self.task.await.map_err(|e| {
            TpixError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("download task failed: {}", e),
            ))
        })?
    }
}
