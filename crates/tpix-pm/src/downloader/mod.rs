//! Streaming downloads with progress reporting.
//!
//! A download runs as one background task. Progress is observed through a
//! small bounded channel owned by that task: when the consumer stops reading
//! the producer waits, and the channel closes exactly once when the task
//! finishes on any path. Errors are collected from the handle after the
//! channel has closed.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tpix_pm::downloader::{Downloader, ReleaseAsset};
//! use tpix_pm::http::HttpClient;
//!
//! # async fn example() -> tpix_pm::Result<()> {
//! let downloader = Downloader::new(Arc::new(HttpClient::new()?));
//! let asset = ReleaseAsset::new("cetz-0.2.2.tar.gz", "https://example.com/cetz.tar.gz", 1024);
//!
//! let mut handle = downloader.download(asset, "/tmp/cetz", None);
//! while let Some(update) = handle.next().await {
//!     if let Some(ratio) = update.ratio() {
//!         println!("{:.0}%", ratio * 100.0);
//!     }
//! }
//! handle.finish().await?;
//! # Ok(())
//! # }
//! ```

mod file;
mod progress;

pub use file::{Downloader, OnFinished, ReleaseAsset};
pub use progress::{DownloadHandle, DownloadProgress, ProgressUpdate, PROGRESS_CHANNEL_CAPACITY};
