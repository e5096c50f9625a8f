//! Self-update.
//!
//! [`SelfUpdater`] compares the running build with the latest published
//! release and replaces the executable with the build for this platform.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tpix_pm::http::HttpClient;
//! use tpix_pm::{Downloader, GithubReleases, SelfUpdater};
//!
//! # async fn example() -> tpix_pm::Result<()> {
//! let http = Arc::new(HttpClient::new()?);
//! let mut updater = SelfUpdater::new(
//!     Arc::new(GithubReleases::new(Arc::clone(&http))),
//!     Downloader::new(http),
//!     "0.2.0",
//! );
//!
//! if updater.check().await? {
//!     let handle = updater.update()?;
//!     handle.finish().await?;
//! }
//! # Ok(())
//! # }
//! ```

mod install;
mod platform;
mod release;
mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::downloader::{DownloadHandle, Downloader, OnFinished};
use crate::{Result, TpixError};

pub use install::{backup_path, ensure_executable, find_binary, install_binary, InstallStrategy};
pub use platform::{select_asset, Platform, ASSET_PREFIX};
pub use release::{GithubReleases, Release, ReleaseInfo, ReleaseSource, LATEST_RELEASE_URL};
pub use version::{compare_version, normalize_version, parse_version};

const STAGING_PREFIX: &str = ".tpix-update-";

pub struct SelfUpdater {
    source: Arc<dyn ReleaseSource>,
    downloader: Downloader,
    current_version: String,
    platform: Platform,
    target: Option<PathBuf>,
    /// Latest release, fetched at most once unless refreshed
    latest: Option<Release>,
}

impl SelfUpdater {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        downloader: Downloader,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            source,
            downloader,
            current_version: current_version.into(),
            platform: Platform::current(),
            target: None,
            latest: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Install into `path` instead of over the running executable
    pub fn with_target(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = Some(path.into());
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The memoized latest release, if one was fetched
    pub fn cached(&self) -> Option<&Release> {
        self.latest.as_ref()
    }

    /// Whether the latest release is newer than the running build
    pub async fn check(&mut self) -> Result<bool> {
        let latest = self.latest().await?.version.clone();
        let newer = compare_version(&latest, &self.current_version)?;
        log::debug!(
            "Latest release {}, running {}, update available: {}",
            latest,
            self.current_version,
            newer
        );
        Ok(newer)
    }

    /// The latest release, fetched on first use
    pub async fn latest(&mut self) -> Result<&Release> {
        if self.latest.is_none() {
            let release = self.fetch_release().await?;
            self.latest = Some(release);
        }

        self.latest
            .as_ref()
            .ok_or_else(|| TpixError::Precondition("no release information".to_string()))
    }

    /// Drop the memoized release and fetch it again
    pub async fn refresh(&mut self) -> Result<&Release> {
        self.latest = None;
        self.latest().await
    }

    /// Download the latest release and install it over the target executable.
    ///
    /// [`check`](Self::check) or [`latest`](Self::latest) must have run
    /// first. The archive is extracted into a fresh staging directory next to
    /// the executable; once extraction succeeds the binary is installed with
    /// the platform's [`InstallStrategy`]. The staging directory is removed
    /// whatever the outcome.
    pub fn update(&self) -> Result<DownloadHandle> {
        let release = self.latest.as_ref().ok_or_else(|| {
            TpixError::Precondition("check for updates first".to_string())
        })?;

        let target = match &self.target {
            Some(path) => path.clone(),
            None => std::env::current_exe()?,
        };
        let binary_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                TpixError::Precondition(format!("invalid executable path {}", target.display()))
            })?;

        let staging = staging_dir(&target)?;
        let strategy = self.platform.install_strategy();
        let staging_path = staging.path().to_path_buf();

        log::info!(
            "Updating {} to {} ({:?})",
            target.display(),
            release.version,
            strategy
        );

        let on_finished: OnFinished = Box::new(move |extracted: &Path| {
            let installed = find_binary(extracted, &binary_name)
                .and_then(|binary| install_binary(&binary, &target, strategy));
            if let Err(e) = staging.close() {
                log::warn!("Failed to remove staging directory: {}", e);
            }
            installed
        });

        Ok(self
            .downloader
            .download(release.asset.clone(), staging_path, Some(on_finished)))
    }

    async fn fetch_release(&self) -> Result<Release> {
        let info = self.source.latest_release().await?;
        let asset = select_asset(&info.assets, &self.platform)?;

        Ok(Release {
            asset,
            version: info.tag_name,
            changelog: info.body,
            published_at: info.published_at,
        })
    }
}

/// Staging directory beside `target`, or in the system temp dir when that
/// directory is not writable
fn staging_dir(target: &Path) -> Result<tempfile::TempDir> {
    let beside = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .and_then(|dir| {
            tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempdir_in(dir)
                .ok()
        });

    match beside {
        Some(dir) => Ok(dir),
        None => Ok(tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?),
    }
}
