//! Registry API.
//!
//! [`Registry`] is the metadata boundary the resolver and the CLI talk to.
//! [`TpixClient`] implements it against the tpix REST API.

mod client;
mod model;

use std::path::Path;

use async_trait::async_trait;

use crate::downloader::ReleaseAsset;
use crate::{PackageRef, Result};

pub use client::TpixClient;
pub use model::{
    DependenciesResponse, PackageResponse, PackageVersionInfo, SearchResponse, SearchResult,
    UploadResponse,
};

/// Package registry interface
#[async_trait]
pub trait Registry: Send + Sync {
    /// Search packages by free text, optionally within one namespace
    async fn search_packages(
        &self,
        query: &str,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<SearchResponse>;

    /// Package details including every published version
    async fn fetch_package(&self, namespace: &str, name: &str) -> Result<PackageResponse>;

    /// Direct dependencies of one package version.
    ///
    /// Entries published before dependency metadata existed may fail here;
    /// callers treat that as a package without dependencies.
    async fn fetch_dependencies(&self, pkg: &PackageRef) -> Result<Vec<PackageRef>>;

    /// Downloadable archive of one package version
    async fn package_asset(&self, pkg: &PackageRef) -> Result<ReleaseAsset>;

    /// Upload a bundled package into `namespace`
    async fn upload_package(&self, path: &Path, namespace: &str) -> Result<UploadResponse>;
}
