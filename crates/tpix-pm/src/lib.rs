pub mod api;
pub mod archive;
pub mod bundler;
pub mod cache;
pub mod config;
pub mod deps;
pub mod downloader;
pub mod error;
pub mod http;
pub mod package;
pub mod resolver;
pub mod updater;

pub use error::{Result, TpixError};
pub use package::{PackageRef, PackageSpec};
pub use api::{Registry, TpixClient};
pub use archive::{ArchiveFormat, ExcludeRules};
pub use bundler::{Manifest, PackageBuilder};
pub use cache::PackageCache;
pub use config::{Config, ConfigLoader};
pub use downloader::{Downloader, DownloadHandle, DownloadProgress, ProgressUpdate, ReleaseAsset};
pub use resolver::{DependencyResolver, PackageFetcher, RegistryFetcher, VisitedSet};
pub use updater::{GithubReleases, Platform, Release, ReleaseSource, SelfUpdater};
